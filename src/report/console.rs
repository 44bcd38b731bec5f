//! Console rendering of a report.
//!
//! Color is decided per `Console`, never through colored's global switch,
//! so renderers writing to different sinks do not interfere.

use super::Builder;
use crate::error::RenderError;
use crate::issues::{Issue, Level, ROOT, Tally, max_severity};
use colored::{Color, Colorize};
use std::io::Write;

/// Report width in columns.
pub const WIDTH: usize = 100;

const LOGO: [&str; 4] = [
    r" ___     ___ _____   _____ ",
    r"| _ \___| _ \ __\ \ / / __|",
    r"|  _/ _ \  _/ _| \ V /| _| ",
    r"|_| \___/_| |___| |_| |___|",
];
const TAGLINE: &str = "  Biffs`em and Buffs`em!";

const LOGO_COLOR: Color = Color::Cyan;
const TITLE_COLOR: Color = Color::BrightBlue;
const RESOURCE_COLOR: Color = Color::BrightGreen;
const DOTS_COLOR: Color = Color::BrightBlack;

pub struct Console<W> {
    out: W,
    color: bool,
}

impl<W: Write> Console<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn level_color(level: Level) -> Color {
        match level {
            Level::Ok => Color::Green,
            Level::Info => Color::BrightCyan,
            Level::Warn => Color::Yellow,
            Level::Error => Color::Red,
        }
    }

    pub fn print_header(&mut self) -> Result<(), RenderError> {
        writeln!(self.out)?;
        for line in LOGO {
            let line = self.paint(line, LOGO_COLOR);
            writeln!(self.out, "{}", line)?;
        }
        let tagline = self.paint(TAGLINE, TITLE_COLOR);
        writeln!(self.out, "{}", tagline)?;
        writeln!(self.out)?;
        Ok(())
    }

    fn print_rule(&mut self) -> Result<(), RenderError> {
        let rule = self.paint(&"┅".repeat(WIDTH), TITLE_COLOR);
        writeln!(self.out, "{}", rule)?;
        Ok(())
    }

    /// Overall score and grade.
    pub fn print_summary(&mut self, report: &Builder) -> Result<(), RenderError> {
        writeln!(self.out)?;
        let title = self.paint("SUMMARY", TITLE_COLOR);
        writeln!(self.out, "{}", title)?;
        self.print_rule()?;
        writeln!(
            self.out,
            "Your cluster score: {} -- {}",
            report.score(),
            report.grade()
        )?;
        writeln!(self.out)?;
        Ok(())
    }

    /// Every section with the resources whose worst issue reaches `level`.
    pub fn print_report(&mut self, report: &Builder, level: Level) -> Result<(), RenderError> {
        for section in report.sections() {
            self.print_section_title(&section.name, &section.tally)?;
            for (fqn, issues) in section.outcome.filter(level).iter() {
                self.print_resource(fqn, issues)?;
            }
            writeln!(self.out)?;
        }
        Ok(())
    }

    /// Run-level errors, if any.
    pub fn print_errors(&mut self, report: &Builder) -> Result<(), RenderError> {
        if report.errors().is_empty() {
            return Ok(());
        }
        let title = self.paint("ERRORS", Self::level_color(Level::Error));
        writeln!(self.out, "{}", title)?;
        self.print_rule()?;
        for err in report.errors() {
            writeln!(self.out, "  {} {}", Level::Error.glyph(), err.message)?;
        }
        writeln!(self.out)?;
        Ok(())
    }

    fn print_section_title(&mut self, name: &str, tally: &Tally) -> Result<(), RenderError> {
        let title = format!("{}S ({} SCANNED)", name.to_uppercase(), tally.total());
        let counts = [Level::Error, Level::Warn, Level::Info, Level::Ok]
            .iter()
            .map(|l| format!("{} {}", l.glyph(), tally.count(*l)))
            .collect::<Vec<_>>()
            .join(" ");
        let score = format!("{}%", tally.score);
        // Glyphs render two columns wide.
        let used = title.chars().count() + counts.chars().count() + 4 + score.len() + 1;
        let pad = WIDTH.saturating_sub(used).max(1);

        writeln!(self.out)?;
        let title = self.paint(&title, TITLE_COLOR);
        let score = self.paint(&score, Self::level_color(score_level(tally.score)));
        writeln!(self.out, "{}{}{} {}", title, " ".repeat(pad), counts, score)?;
        self.print_rule()
    }

    fn print_resource(&mut self, fqn: &str, issues: &[Issue]) -> Result<(), RenderError> {
        let level = max_severity(issues);
        let dots = WIDTH.saturating_sub(fqn.chars().count() + 5).max(1);
        let name = self.paint(fqn, RESOURCE_COLOR);
        let dots = self.paint(&".".repeat(dots), DOTS_COLOR);
        writeln!(self.out, "  · {}{}{}", name, dots, level.glyph())?;

        for issue in issues.iter().filter(|i| i.is_group(ROOT)) {
            self.print_issue(4, issue)?;
        }

        let mut groups: Vec<&str> = Vec::new();
        for issue in issues.iter().filter(|i| !i.is_group(ROOT)) {
            if !groups.contains(&issue.group.as_str()) {
                groups.push(&issue.group);
            }
        }
        for group in groups {
            let members: Vec<&Issue> = issues.iter().filter(|i| i.is_group(group)).collect();
            let level = max_severity(members.iter().copied());
            let label = self.paint(group, RESOURCE_COLOR);
            writeln!(self.out, "    {} {}", level.glyph(), label)?;
            for issue in members {
                self.print_issue(6, issue)?;
            }
        }
        Ok(())
    }

    fn print_issue(&mut self, indent: usize, issue: &Issue) -> Result<(), RenderError> {
        let message = self.paint(&format!("{}.", issue.message()), Self::level_color(issue.level));
        writeln!(
            self.out,
            "{}{} {}",
            " ".repeat(indent),
            issue.level.glyph(),
            message
        )?;
        Ok(())
    }
}

/// Level a score is shown at.
fn score_level(score: u8) -> Level {
    match score {
        80..=u8::MAX => Level::Ok,
        60..=79 => Level::Warn,
        _ => Level::Error,
    }
}
