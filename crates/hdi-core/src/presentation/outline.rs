//! Parser for the slide outline format the model is asked to produce:
//!
//! ```text
//! JUDUL: Energi Hidrogen
//!
//! SLIDE 1:
//! Judul: Pendahuluan
//! - Poin 1
//! • Poin 2
//! ```

use serde::Serialize;

pub const DEFAULT_TITLE: &str = "Presentasi ChatHDI";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineSlide {
    pub title: String,
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outline {
    pub title: String,
    pub slides: Vec<OutlineSlide>,
}

fn value_after_colon(line: &str) -> String {
    line.split_once(':')
        .map(|(_, v)| v.trim().to_string())
        .unwrap_or_default()
}

/// Parse `text` into a deck outline. Slides without bullets are dropped.
///
/// A `Judul:` line before the first `SLIDE` header titles the deck; after it,
/// the line titles the current slide. Markdown bold and heading markers
/// around the keywords are ignored.
pub fn parse_outline(text: &str) -> Outline {
    let mut outline = Outline {
        title: DEFAULT_TITLE.to_string(),
        slides: Vec::new(),
    };
    let mut current: Option<OutlineSlide> = None;

    for raw in text.lines() {
        let line = raw.replace("**", "");
        let line = line.trim().trim_start_matches('#').trim();
        let upper = line.to_uppercase();

        if upper.starts_with("JUDUL:") {
            let value = value_after_colon(line);
            match current.as_mut() {
                Some(slide) => slide.title = value,
                None => outline.title = value,
            }
        } else if upper.starts_with("SLIDE") {
            if let Some(slide) = current.take().filter(|s| !s.bullets.is_empty()) {
                outline.slides.push(slide);
            }
            current = Some(OutlineSlide {
                title: String::new(),
                bullets: Vec::new(),
            });
        } else if let Some(rest) = line.strip_prefix('-').or_else(|| line.strip_prefix('•')) {
            if let Some(slide) = current.as_mut() {
                let bullet = rest.trim();
                if !bullet.is_empty() {
                    slide.bullets.push(bullet.to_string());
                }
            }
        }
    }

    if let Some(slide) = current.filter(|s| !s.bullets.is_empty()) {
        outline.slides.push(slide);
    }

    outline
}
