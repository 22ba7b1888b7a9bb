use std::io::Write;

use anyhow::Result;
use clap::Args;
use stamping::font::{FontFamily, StandardFont};
use strum::IntoEnumIterator;

/// Lists the fonts that can be stamped with, by family.
#[derive(Args, Debug)]
pub struct Command {}

/// Runs the subcommand.
pub fn run(_cmd: &Command) -> Result<()> {
    write_fonts(&mut std::io::stdout().lock())?;
    Ok(())
}

fn write_fonts<W: Write>(out: &mut W) -> std::io::Result<()> {
    for family in FontFamily::iter() {
        writeln!(out, "{family}")?;
        for font in StandardFont::iter().filter(|font| font.family() == family) {
            writeln!(out, "    {font}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use googletest::prelude::*;

    use super::*;

    #[gtest]
    fn test_write_fonts() -> anyhow::Result<()> {
        let mut out = Vec::new();
        write_fonts(&mut out)?;

        let text = String::from_utf8(out)?;
        let lines: Vec<&str> = text.lines().collect();
        expect_that!(lines, len(eq(17)));
        expect_that!(
            lines[..5].to_vec(),
            elements_are![
                eq(&"Times-Roman"),
                eq(&"    Times-Roman"),
                eq(&"    Times-Bold"),
                eq(&"    Times-Italic"),
                eq(&"    Times-BoldItalic"),
            ]
        );
        expect_that!(lines.last(), some(eq(&"    Symbol")));
        Ok(())
    }
}
