use crate::errors::AppResult;
use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str};
use std::fs;
use std::path::Path;

/// A4 in points.
const A4_SHORT: f32 = 595.0;
const A4_LONG: f32 = 842.0;

/// Helvetica average glyph width, as a fraction of the font size.
const AVG_GLYPH: f32 = 0.52;

struct Layout {
    page_w: f32,
    page_h: f32,
    margin: f32,
    row_h: f32,
    font_size: f32,
    header_font_size: f32,
    title_font_size: f32,
}

/// Minimal paginated table writer: title, optional "label: value" details,
/// then a striped table continued over as many pages as needed.
pub struct PdfManager {
    pdf: Pdf,
    catalog_id: Ref,
    pages_id: Ref,
    page_refs: Vec<Ref>,
    next_id: i32,
    font_id: Ref,
    bold_id: Ref,
    layout: Layout,
}

impl PdfManager {
    pub fn landscape() -> Self {
        Self::with_size(A4_LONG, A4_SHORT)
    }

    fn with_size(page_w: f32, page_h: f32) -> Self {
        let mut pdf = Pdf::new();

        // ID gestiti a mano
        let catalog_id = Ref::new(1);
        let pages_id = Ref::new(2);
        let font_id = Ref::new(3);
        let bold_id = Ref::new(4);

        pdf.type1_font(font_id)
            .base_font(Name(b"Helvetica"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
        pdf.type1_font(bold_id)
            .base_font(Name(b"Helvetica-Bold"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));

        Self {
            pdf,
            catalog_id,
            pages_id,
            page_refs: Vec::new(),
            next_id: 5,
            font_id,
            bold_id,
            layout: Layout {
                page_w,
                page_h,
                margin: 40.0,
                row_h: 18.0,
                font_size: 9.0,
                header_font_size: 10.0,
                title_font_size: 15.0,
            },
        }
    }

    fn fresh_ref(&mut self) -> Ref {
        let id = self.next_id;
        self.next_id += 1;
        Ref::new(id)
    }

    fn write_page(&mut self, content: Content) {
        let page_id = self.fresh_ref();
        let content_id = self.fresh_ref();
        self.page_refs.push(page_id);

        let l = &self.layout;
        let mut page = self.pdf.page(page_id);
        page.parent(self.pages_id)
            .media_box(Rect::new(0.0, 0.0, l.page_w, l.page_h))
            .contents(content_id);
        let mut res = page.resources();
        let mut fonts = res.fonts();
        fonts.pair(Name(b"F1"), self.font_id);
        fonts.pair(Name(b"F2"), self.bold_id);
        drop(fonts);
        drop(res);
        drop(page);

        self.pdf.stream(content_id, &content.finish());
    }

    fn text(content: &mut Content, font: &[u8], size: f32, x: f32, y: f32, text: &str) {
        let bytes = win_ansi(text);
        content.begin_text();
        content.set_font(Name(font), size);
        content.set_text_matrix([1.0, 0.0, 0.0, 1.0, x, y]);
        content.show(Str(&bytes));
        content.end_text();
    }

    fn fill_band(&self, content: &mut Content, y: f32, w: f32, grey: f32) {
        content.save_state();
        content.set_fill_rgb(grey, grey, grey + 0.02);
        content.rect(self.layout.margin, y, w, self.layout.row_h);
        content.fill_nonzero();
        content.restore_state();
    }

    fn draw_row(&self, content: &mut Content, y: f32, widths: &[f32], row: &[String], header: bool) {
        let (font, size): (&[u8], f32) = if header {
            (b"F2", self.layout.header_font_size)
        } else {
            (b"F1", self.layout.font_size)
        };

        let mut x = self.layout.margin;
        for (i, w) in widths.iter().enumerate() {
            let cell = row.get(i).map(String::as_str).unwrap_or("");
            Self::text(content, font, size, x + 3.0, y + 5.0, &fit(cell, *w - 6.0, size));

            content.save_state();
            content.set_stroke_rgb(0.65, 0.65, 0.65);
            content.rect(x, y, *w, self.layout.row_h);
            content.stroke();
            content.restore_state();

            x += w;
        }
    }

    /// Column widths from content length, scaled to the printable width.
    fn col_widths(&self, headers: &[&str], rows: &[Vec<String>]) -> Vec<f32> {
        let l = &self.layout;
        let mut widths: Vec<f32> = headers
            .iter()
            .map(|h| h.chars().count() as f32 * l.header_font_size * AVG_GLYPH + 8.0)
            .collect();

        for row in rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = w.max(cell.chars().count() as f32 * l.font_size * AVG_GLYPH + 8.0);
            }
        }

        let total: f32 = widths.iter().sum();
        let max = l.page_w - 2.0 * l.margin;
        if total > 0.0 && total != max {
            // stretch short tables too, so every page has the same frame
            let scale = max / total;
            widths.iter_mut().for_each(|w| *w *= scale);
        }
        widths
    }

    fn page_frame(&self, content: &mut Content, title: &str, page: usize) -> f32 {
        let l = &self.layout;
        let top = l.page_h - l.margin;
        Self::text(content, b"F2", l.title_font_size, l.margin, top - l.title_font_size, title);
        Self::text(
            content,
            b"F1",
            l.font_size,
            l.page_w - l.margin - 40.0,
            l.margin / 2.0,
            &format!("Page {page}"),
        );
        top - l.title_font_size - 14.0
    }

    /// Title and details on the first page, then the table.
    pub fn write_report(
        &mut self,
        title: &str,
        details: &[(String, String)],
        headers: &[&str],
        rows: &[Vec<String>],
    ) {
        let widths = self.col_widths(headers, rows);
        let table_w: f32 = widths.iter().sum();
        let header_row: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        let bottom = self.layout.margin;
        let row_h = self.layout.row_h;

        let mut remaining: &[Vec<String>] = rows;
        let mut page = 1;

        loop {
            let mut content = Content::new();
            let mut y = self.page_frame(&mut content, title, page);

            if page == 1 {
                for (label, value) in details {
                    y -= self.layout.font_size + 5.0;
                    Self::text(&mut content, b"F2", self.layout.font_size, self.layout.margin, y, &format!("{label}:"));
                    Self::text(&mut content, b"F1", self.layout.font_size, self.layout.margin + 110.0, y, value);
                }
                if !details.is_empty() {
                    y -= 12.0;
                }
            }

            y -= row_h;
            self.fill_band(&mut content, y, table_w, 0.85);
            self.draw_row(&mut content, y, &widths, &header_row, true);

            let mut consumed = 0;
            for (i, row) in remaining.iter().enumerate() {
                if y - row_h < bottom {
                    break;
                }
                y -= row_h;
                // zebra stripe
                if i % 2 == 0 {
                    self.fill_band(&mut content, y, table_w, 0.96);
                }
                self.draw_row(&mut content, y, &widths, row, false);
                consumed += 1;
            }

            self.write_page(content);
            remaining = &remaining[consumed..];
            page += 1;

            // consumed == 0 only if not even one row fits: stop instead of looping
            if remaining.is_empty() || consumed == 0 {
                break;
            }
        }
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.pdf.catalog(self.catalog_id).pages(self.pages_id);
        let count = self.page_refs.len() as i32;
        self.pdf
            .pages(self.pages_id)
            .count(count)
            .kids(self.page_refs.iter().copied());
        self.pdf.finish()
    }

    pub fn save(self, path: &Path) -> AppResult<()> {
        fs::write(path, self.finish())?;
        Ok(())
    }
}

/// Truncate `text` so it fits `width` points at `size`.
fn fit(text: &str, width: f32, size: f32) -> String {
    let max = (width / (size * AVG_GLYPH)).floor().max(1.0) as usize;
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(2)).collect();
    out.push_str("..");
    out
}

/// Latin-1 subset of WinAnsi; anything else becomes '?'.
pub(crate) fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u32::from(c) {
            cp @ 0x20..=0x7E | cp @ 0xA0..=0xFF => cp as u8,
            _ => b'?',
        })
        .collect()
}
