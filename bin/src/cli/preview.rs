use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use pdfium_render::prelude::*;
use stamping::{
    output,
    stamp::{Position, stamp},
    template::Template,
};

use super::stampargs::StampArgs;

/// Length of each arm of the crosshair marking the stamp position, in pixels.
const CROSSHAIR_ARM: u32 = 10;

/// Stamps a sample name onto the template, to check the settings before generating a batch.
#[derive(Args, Debug)]
pub struct Command {
    /// Path to the certificate template PDF. Only its first page is used.
    template: PathBuf,

    /// Path to write the stamped PDF to.
    output: PathBuf,

    /// Name to stamp. It is formatted with the name format as the first name in a list.
    #[arg(long, default_value = "Jane Doe")]
    sample: String,

    /// Also render the stamped page to this PNG image, with a crosshair marking the configured
    /// position. This requires the pdfium library.
    #[arg(long)]
    image: Option<PathBuf>,

    /// Resolution of the rendered image, in dots per inch.
    #[arg(long, default_value = "100")]
    dpi: f32,

    /// Path to the pdfium library. Defaults to the library installed on the system.
    #[arg(long)]
    pdfium_library: Option<PathBuf>,

    /// Options relating to how the name is stamped.
    #[command(flatten)]
    stamp: StampArgs,
}

/// Runs the subcommand.
pub fn run(cmd: &Command, xdg_dirs: &xdg::BaseDirectories) -> Result<()> {
    let settings = cmd.stamp.resolve_settings(xdg_dirs)?;
    let prepared = settings
        .prepare()
        .with_context(|| "validating settings")?;
    let template = Template::open(&cmd.template)?;

    let text = prepared.name_format.format_entry(&cmd.sample, 0);
    let pdf = stamp(&template, &text, &prepared.stamp)?;
    output::write_output(&cmd.output, &pdf, true)?;
    eprintln!("Wrote preview of {text:?} to {:?}.", cmd.output);

    if let Some(image_path) = &cmd.image {
        let pdfium = bind_pdfium(cmd.pdfium_library.as_deref())?;
        let marker = ImageMarker {
            position: prepared.stamp.position,
            view_box: template.crop_box(),
            rotation: template.rotation(),
            scale: cmd.dpi / 72.0,
        };
        render_image(&pdfium, &pdf, &marker, image_path)
            .with_context(|| format!("rendering preview image {image_path:?}"))?;
        eprintln!("Wrote preview image to {image_path:?}.");
    }

    Ok(())
}

fn bind_pdfium(library: Option<&Path>) -> Result<Pdfium> {
    let bindings = match library {
        Some(path) => Pdfium::bind_to_library(path)
            .with_context(|| format!("binding to pdfium library {path:?}"))?,
        None => Pdfium::bind_to_system_library()
            .with_context(|| "binding to the system pdfium library")?,
    };
    Ok(Pdfium::new(bindings))
}

/// Maps the stamp position from PDF page space onto a rendered image of the page.
struct ImageMarker {
    position: Position,
    /// The page's crop box, which is the region rendered.
    view_box: [f32; 4],
    /// Clockwise rotation applied when rendering, in degrees.
    rotation: u16,
    /// Image pixels per point.
    scale: f32,
}

impl ImageMarker {
    /// Pixel coordinates of the position. PDF space has its origin at the bottom left of the
    /// view box, images at the top left of the page after rotation.
    fn pixel(&self) -> (i64, i64) {
        let [left, bottom, right, top] = self.view_box;
        let Position { x, y } = self.position;
        let (px, py) = match self.rotation {
            90 => (y - bottom, x - left),
            180 => (right - x, y - bottom),
            270 => (top - y, right - x),
            _ => (x - left, top - y),
        };
        (
            (px * self.scale).round() as i64,
            (py * self.scale).round() as i64,
        )
    }
}

fn render_image(pdfium: &Pdfium, pdf: &[u8], marker: &ImageMarker, path: &Path) -> Result<()> {
    let document = pdfium.load_pdf_from_byte_slice(pdf, None)?;
    let page = document.pages().first()?;

    let config = PdfRenderConfig::new().scale_page_by_factor(marker.scale);
    let mut page_image = page.render_with_config(&config)?.as_image().into_rgb8();
    draw_crosshair(
        &mut page_image,
        marker.pixel(),
        CROSSHAIR_ARM,
        image::Rgb::<u8>([255, 0, 0]),
    );
    page_image.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

/// Draws a crosshair centered on `center`. Parts that fall outside the image are skipped.
fn draw_crosshair<I: image::GenericImage>(
    img: &mut I,
    center: (i64, i64),
    arm: u32,
    pixel: I::Pixel,
) {
    let (cx, cy) = center;
    let arm = i64::from(arm);
    let (width, height) = (i64::from(img.width()), i64::from(img.height()));

    for d in -arm..=arm {
        for (x, y) in [(cx + d, cy), (cx, cy + d)] {
            if (0..width).contains(&x) && (0..height).contains(&y) {
                img.put_pixel(x as u32, y as u32, pixel);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use googletest::prelude::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;
    use test_casing::test_casing;

    use super::*;

    #[derive(Parser, Debug)]
    struct TestArgs {
        #[command(flatten)]
        cmd: Command,
    }

    const RED: Rgb<u8> = Rgb([255, 0, 0]);

    fn red_pixels(img: &RgbImage) -> Vec<(u32, u32)> {
        img.enumerate_pixels()
            .filter(|(_, _, pixel)| **pixel == RED)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[gtest]
    fn test_crosshair() {
        let mut img = RgbImage::new(50, 50);

        draw_crosshair(&mut img, (20, 30), 10, RED);

        let red = red_pixels(&img);
        expect_that!(red, len(eq(41)));
        expect_that!(red, contains(eq(&(10, 30))));
        expect_that!(red, contains(eq(&(30, 30))));
        expect_that!(red, contains(eq(&(20, 20))));
        expect_that!(red, contains(eq(&(20, 40))));
        expect_that!(red, not(contains(eq(&(21, 31)))));
    }

    #[gtest]
    fn test_crosshair_clipped_at_edges() {
        let mut img = RgbImage::new(8, 8);

        draw_crosshair(&mut img, (0, 7), 10, RED);

        expect_that!(red_pixels(&img), len(eq(15)));
    }

    #[gtest]
    fn test_crosshair_outside_image() {
        let mut img = RgbImage::new(8, 8);

        draw_crosshair(&mut img, (-50, 100), 10, RED);

        expect_that!(red_pixels(&img), is_empty());
    }

    #[test_casing(5, [
        ((300.0, 400.0), [0.0, 0.0, 612.0, 792.0], 1.0, (300, 392)),
        ((300.0, 400.0), [0.0, 0.0, 612.0, 792.0], 100.0 / 72.0, (417, 544)),
        ((0.0, 0.0), [0.0, 0.0, 612.0, 792.0], 2.0, (0, 1584)),
        ((110.0, 120.0), [10.0, 20.0, 622.0, 812.0], 1.0, (100, 692)),
        ((300.0, 400.0), [50.0, 50.0, 562.0, 742.0], 1.0, (250, 342)),
    ])]
    fn test_marker_pixel(
        position: (f32, f32),
        view_box: [f32; 4],
        scale: f32,
        expected: (i64, i64),
    ) {
        let marker = ImageMarker {
            position: Position {
                x: position.0,
                y: position.1,
            },
            view_box,
            rotation: 0,
            scale,
        };
        assert_that!(marker.pixel(), eq(expected));
    }

    #[test_casing(4, [(0, (300, 392)), (90, (400, 300)), (180, (312, 400)), (270, (392, 312))])]
    fn test_marker_pixel_rotated(rotation: u16, expected: (i64, i64)) {
        let marker = ImageMarker {
            position: Position { x: 300.0, y: 400.0 },
            view_box: [0.0, 0.0, 612.0, 792.0],
            rotation,
            scale: 1.0,
        };
        assert_that!(marker.pixel(), eq(expected));
    }

    #[gtest]
    fn test_marker_pixel_corners_follow_rotation() {
        // The top left corner of the unrotated page ends up at the top right once turned
        // clockwise, and the bottom left at the top left.
        let marker = |x, y| ImageMarker {
            position: Position { x, y },
            view_box: [0.0, 0.0, 200.0, 100.0],
            rotation: 90,
            scale: 1.0,
        };
        expect_that!(marker(0.0, 100.0).pixel(), eq((100, 0)));
        expect_that!(marker(0.0, 0.0).pixel(), eq((0, 0)));
        expect_that!(marker(200.0, 0.0).pixel(), eq((0, 200)));
    }

    #[gtest]
    fn test_preview_pdf() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let template = dir.path().join("template.pdf");
        std::fs::write(&template, testutils::blank_pdf(testutils::A4, 1))?;
        let settings = dir.path().join("settings.yaml");
        std::fs::write(&settings, "name_format: 'Awarded to {name} (#{index})'\n")?;
        let output = dir.path().join("preview.pdf");

        let cmd = TestArgs::try_parse_from([
            "test".to_string(),
            template.display().to_string(),
            output.display().to_string(),
            format!("--settings={}", settings.display()),
            "--color=#FF0000".to_string(),
        ])?
        .cmd;
        run(&cmd, &xdg::BaseDirectories::with_prefix("signit-test"))?;

        let shown = testutils::shown_text(&std::fs::read(&output)?)?;
        expect_that!(shown, len(eq(1)));
        expect_that!(shown[0].text, eq("Awarded to Jane Doe (#1)"));
        expect_that!(shown[0].base_font, eq("Times-Roman"));
        expect_that!(shown[0].color, eq([1.0, 0.0, 0.0]));
        expect_that!(shown[0].x, near(300.0, 1e-3));
        expect_that!(shown[0].y, near(400.0, 1e-3));
        Ok(())
    }
}
