use crate::cli::commands::runtime;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::errors::AppResult;
use crate::server;
use crate::ui::messages::info;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Serve {
        bind,
        watch_dir,
        no_backlog,
    } = cmd
    {
        let mut cfg = cfg.clone();
        if let Some(b) = bind {
            cfg.bind = b.clone();
        }
        if let Some(d) = watch_dir {
            cfg.watch_dir = d.clone();
        }
        if *no_backlog {
            cfg.process_backlog = false;
        }
        cfg.validate()?;

        info(format!(
            "Serving on http://{} (watching {}), Ctrl-C to stop",
            cfg.bind, cfg.watch_dir
        ));

        runtime()?.block_on(server::run(cfg))?;
    }
    Ok(())
}
