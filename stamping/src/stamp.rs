//! Stamping a single text onto a template.

use anyhow::Context;
use lopdf::Document;
use serde::Deserialize;

use crate::{
    error::{Result, StampError},
    font::{FontSpec, encoding},
    pdfpage,
    render::{PlacedText, RenderStrategy},
    template::Template,
};

/// A point in PDF page space: origin at the bottom left, in points (1/72 inch).
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    /// Returns the position if both coordinates are finite, as PDF numbers cannot be NaN or
    /// infinite.
    pub fn validate(self) -> Result<Self> {
        if self.x.is_finite() && self.y.is_finite() {
            Ok(self)
        } else {
            Err(StampError::InvalidPosition {
                x: self.x,
                y: self.y,
            })
        }
    }
}

/// Everything needed to stamp text, other than the template and the text itself. Prepared and
/// validated once, then shared by every job of a batch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StampConfig {
    pub font: FontSpec,
    pub position: Position,
    /// If `true`, `position` is the center of the text rather than the start of its baseline.
    pub centered: bool,
    pub strategy: RenderStrategy,
}

impl StampConfig {
    /// Start of the baseline for `text`.
    ///
    /// When centered, the text's measured width is centered horizontally on `position`, and the
    /// baseline is raised by half the font size.
    pub fn text_origin(&self, text: &str) -> Position {
        if !self.centered {
            return self.position;
        }
        let size = self.font.size() as f32;
        Position {
            x: self.position.x - self.font.text_width(text) / 2.0,
            y: self.position.y + size / 2.0,
        }
    }

    /// Encodes and positions `text` for rendering.
    pub fn place(&self, text: &str) -> Result<PlacedText> {
        self.position.validate()?;
        let font = self.font.font();
        let encoded = encoding::encode_text(font, text).map_err(|c| StampError::Render {
            text: text.to_string(),
            cause: format!("character {c:?} cannot be encoded in font {font}"),
        })?;
        Ok(PlacedText {
            font,
            size: self.font.size() as f32,
            color: self.font.color(),
            origin: self.text_origin(text),
            encoded,
        })
    }
}

/// Stamps `text` onto a copy of the first page of `template`, returning the bytes of a single
/// page PDF. The template itself is not modified.
pub fn stamp(template: &Template, text: &str, config: &StampConfig) -> Result<Vec<u8>> {
    let placed = config.place(text)?;
    let page_id = template.first_page_id();
    let mut doc: Document = template.document().clone();

    let render = |doc: &mut Document| -> anyhow::Result<Vec<u8>> {
        config
            .strategy
            .renderer()
            .render(doc, page_id, &placed)
            .with_context(|| format!("rendering with strategy {}", config.strategy))?;
        pdfpage::isolate_page(doc, page_id).context("reducing output to the first page")?;
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).context("serialising output PDF")?;
        Ok(bytes)
    };
    render(&mut doc).map_err(|err| StampError::render(text, err))
}

#[cfg(test)]
mod tests {
    use googletest::prelude::*;
    use test_casing::test_casing;
    use testutils::{ShownText, shown_text};

    use super::*;
    use crate::error::ErrorKind;

    const STRATEGIES: [RenderStrategy; 2] = [RenderStrategy::Direct, RenderStrategy::Overlay];

    fn config(
        font: &str,
        size: i64,
        color: &str,
        (x, y): (f32, f32),
        centered: bool,
        strategy: RenderStrategy,
    ) -> StampConfig {
        StampConfig {
            font: FontSpec::new(font, size, false, false, color).expect("valid font spec"),
            position: Position { x, y },
            centered,
            strategy,
        }
    }

    fn letter_template() -> Template {
        Template::from_bytes("letter.pdf", &testutils::blank_pdf(testutils::LETTER, 1))
            .expect("valid template")
    }

    fn page_count(pdf: &[u8]) -> anyhow::Result<usize> {
        Ok(Document::load_mem(pdf)?.get_pages().len())
    }

    #[test_casing(2, STRATEGIES)]
    fn test_stamp_name_on_blank_page(strategy: RenderStrategy) -> anyhow::Result<()> {
        let cfg = config("Helvetica", 24, "#000000", (300.0, 400.0), false, strategy);

        let pdf = stamp(&letter_template(), "Jane Doe", &cfg)?;

        assert_that!(page_count(&pdf)?, eq(1));
        assert_that!(
            shown_text(&pdf)?,
            elements_are![eq(&ShownText {
                text: "Jane Doe".to_string(),
                base_font: "Helvetica".to_string(),
                size: 24.0,
                x: 300.0,
                y: 400.0,
                color: [0.0, 0.0, 0.0],
            })]
        );
        Ok(())
    }

    #[test_casing(2, STRATEGIES)]
    fn test_stamp_centered(strategy: RenderStrategy) -> anyhow::Result<()> {
        // Courier is monospaced: 4 glyphs of 600/1000 at 10pt are 24pt wide.
        let cfg = config("Courier", 10, "#000000", (300.0, 400.0), true, strategy);

        let pdf = stamp(&letter_template(), "abcd", &cfg)?;

        let shown = shown_text(&pdf)?;
        assert_that!(shown, len(eq(1)));
        assert_that!(shown[0].x, near(288.0, 0.01));
        assert_that!(shown[0].y, near(405.0, 0.01));
        Ok(())
    }

    #[gtest]
    fn test_text_origin_centers_on_measured_width() {
        let cfg = config(
            "Helvetica",
            10,
            "#000000",
            (100.0, 50.0),
            true,
            RenderStrategy::Direct,
        );
        // "Hi" in Helvetica: H=722, i=222.
        let origin = cfg.text_origin("Hi");
        expect_that!(origin.x, near(100.0 - 9.44 / 2.0, 0.001));
        expect_that!(origin.y, near(55.0, 0.001));
    }

    #[gtest]
    fn test_text_origin_centers_latin_name() {
        let cfg = config(
            "Helvetica",
            10,
            "#000000",
            (100.0, 50.0),
            true,
            RenderStrategy::Direct,
        );
        // "Ærø" in Helvetica: Æ=1000, r=333, ø=611.
        let origin = cfg.text_origin("Ærø");
        expect_that!(origin.x, near(100.0 - 19.44 / 2.0, 0.001));
    }

    #[gtest]
    fn test_position_validate() {
        let finite = Position { x: -5.0, y: 1e6 };
        expect_that!(finite.validate().map_err(|e| e.kind()), ok(eq(finite)));
        expect_that!(
            Position { x: f32::NAN, y: 0.0 }.validate().map_err(|e| e.kind()),
            err(eq(ErrorKind::InvalidPosition))
        );
    }

    #[gtest]
    fn test_stamp_rejects_non_finite_position() {
        let cfg = config(
            "Helvetica",
            24,
            "#000000",
            (f32::INFINITY, 400.0),
            false,
            RenderStrategy::Direct,
        );
        expect_that!(
            stamp(&letter_template(), "Jane Doe", &cfg).map_err(|e| e.kind()),
            err(eq(&ErrorKind::InvalidPosition))
        );
    }

    #[test_casing(2, STRATEGIES)]
    fn test_stamp_color_and_style(strategy: RenderStrategy) -> anyhow::Result<()> {
        let cfg = StampConfig {
            font: FontSpec::new("Times", 30, true, true, "#FF0000")?,
            position: Position { x: 72.0, y: 72.0 },
            centered: false,
            strategy,
        };

        let pdf = stamp(&letter_template(), "Ada", &cfg)?;

        let shown = shown_text(&pdf)?;
        assert_that!(shown, len(eq(1)));
        assert_that!(shown[0].base_font, eq("Times-BoldItalic"));
        assert_that!(shown[0].color, eq([1.0, 0.0, 0.0]));
        Ok(())
    }

    #[gtest]
    fn test_strategies_show_the_same_text() -> anyhow::Result<()> {
        let template = letter_template();
        let shown_with = |strategy| -> anyhow::Result<Vec<ShownText>> {
            let cfg = config("Helvetica", 18, "#336699", (200.0, 300.0), true, strategy);
            shown_text(&stamp(&template, "Grace Hopper", &cfg)?)
        };

        expect_that!(
            shown_with(RenderStrategy::Direct)?,
            eq(&shown_with(RenderStrategy::Overlay)?)
        );
        Ok(())
    }

    #[test_casing(2, STRATEGIES)]
    fn test_stamp_is_repeatable(strategy: RenderStrategy) -> anyhow::Result<()> {
        let template = letter_template();
        let cfg = config("Courier", 12, "#000000", (10.0, 10.0), false, strategy);

        let first = stamp(&template, "Alan Turing", &cfg)?;
        let second = stamp(&template, "Alan Turing", &cfg)?;

        assert_that!(shown_text(&first)?, eq(&shown_text(&second)?));
        Ok(())
    }

    #[test_casing(2, STRATEGIES)]
    fn test_stamp_keeps_template_content(strategy: RenderStrategy) -> anyhow::Result<()> {
        let template = Template::from_bytes(
            "certificate.pdf",
            &testutils::certificate_pdf(
                "0 0 1 rg BT /F1 12 Tf 100 700 Td (Certificate of Completion) Tj ET",
            ),
        )?;
        let cfg = config("Helvetica", 24, "#000000", (300.0, 400.0), false, strategy);

        let shown = shown_text(&stamp(&template, "Jane Doe", &cfg)?)?;

        assert_that!(shown, len(eq(2)));
        assert_that!(shown[0].text, eq("Certificate of Completion"));
        assert_that!(shown[0].base_font, eq("Times-Roman"));
        assert_that!(shown[1].text, eq("Jane Doe"));
        // The template's fill color does not leak into the stamp.
        assert_that!(shown[1].color, eq([0.0, 0.0, 0.0]));
        Ok(())
    }

    #[test_casing(2, STRATEGIES)]
    fn test_stamp_multi_page_template_outputs_one_page(
        strategy: RenderStrategy,
    ) -> anyhow::Result<()> {
        let template = Template::from_bytes("a4.pdf", &testutils::blank_pdf(testutils::A4, 3))?;
        let cfg = config("Helvetica", 24, "#000000", (300.0, 400.0), false, strategy);

        let pdf = stamp(&template, "Jane Doe", &cfg)?;

        assert_that!(page_count(&pdf)?, eq(1));
        let doc = Document::load_mem(&pdf)?;
        let page_id = *doc.get_pages().values().next().context("no page")?;
        assert_that!(pdfpage::media_box(&doc, page_id)?, eq(testutils::A4));
        Ok(())
    }

    #[gtest]
    fn test_stamp_does_not_modify_template() -> anyhow::Result<()> {
        let template = letter_template();
        let before = template.document().objects.len();
        let cfg = config(
            "Helvetica",
            24,
            "#000000",
            (300.0, 400.0),
            false,
            RenderStrategy::Direct,
        );

        stamp(&template, "Jane Doe", &cfg)?;

        expect_that!(template.document().objects.len(), eq(before));
        Ok(())
    }

    #[test_casing(3, [
        ("Helvetica", "日本"),
        ("Times", "Łukasz"),
        ("Symbol", "Zoë"),
    ])]
    fn test_stamp_unencodable_text(font: &str, text: &str) {
        let cfg = config(font, 24, "#000000", (0.0, 0.0), false, RenderStrategy::Direct);
        assert_that!(
            stamp(&letter_template(), text, &cfg).map_err(|e| e.kind()),
            err(eq(&ErrorKind::Render))
        );
    }

    #[gtest]
    fn test_stamp_latin1_text() -> anyhow::Result<()> {
        let cfg = config(
            "Helvetica",
            24,
            "#000000",
            (0.0, 0.0),
            false,
            RenderStrategy::Direct,
        );

        let shown = shown_text(&stamp(&letter_template(), "Zoë Müller", &cfg)?)?;

        assert_that!(shown, len(eq(1)));
        expect_that!(shown[0].text, eq("Zoë Müller"));
        Ok(())
    }
}
