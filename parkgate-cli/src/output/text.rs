//! Text output formatting with colors.

use chrono::{DateTime, Local, Utc};

use parkgate_core::{PriceDisplay, VehicleSession, VehicleStatus, format_amount, CURRENCY};
use parkgate_desk::{ExitOutcome, Notice, NoticeLevel};
use parkgate_store::{DirectoryPage, ShiftSummary};

use crate::commands::show::QuoteView;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

const PLATE_WIDTH: usize = 10;
const ZONE_WIDTH: usize = 6;
const STATUS_WIDTH: usize = 8;
const TIME_WIDTH: usize = 16;

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    // ========================================================================
    // Directory
    // ========================================================================

    /// Formats one directory page as a table.
    pub fn format_directory(&self, page: &DirectoryPage) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "{} {}",
            self.bold("Cars"),
            self.dim(&format!(
                "(page {} of {}, {} total)",
                page.filter.page,
                page.total_pages.max(1),
                page.total
            ))
        ));
        lines.push("─".repeat(80));

        if page.entries.is_empty() {
            lines.push(self.dim("No cars found"));
            return lines.join("\n");
        }

        lines.push(self.dim(&format!(
            "{:<PLATE_WIDTH$} {:<ZONE_WIDTH$} {:<STATUS_WIDTH$} {:<TIME_WIDTH$} {:<TIME_WIDTH$} Fee",
            "Plate", "Zone", "Status", "Entered", "Exited"
        )));
        for session in &page.entries {
            lines.push(self.format_session(session));
        }

        if page.page_window.len() > 1 {
            let pages: Vec<String> = page
                .page_window
                .iter()
                .map(|&n| {
                    if n == page.filter.page {
                        self.bold(&format!("[{n}]"))
                    } else {
                        n.to_string()
                    }
                })
                .collect();
            lines.push(String::new());
            lines.push(format!("Pages: {}", pages.join(" ")));
        }

        lines.join("\n")
    }

    /// Formats one session as a table row.
    pub fn format_session(&self, session: &VehicleSession) -> String {
        let status = format!("{:<STATUS_WIDTH$}", session.status.as_str());
        format!(
            "{:<PLATE_WIDTH$} {:<ZONE_WIDTH$} {} {:<TIME_WIDTH$} {:<TIME_WIDTH$} {}",
            session.plate_number,
            session.parking_zone,
            self.color_for_status(session.status, &status),
            format_time(session.entry_time),
            format_time(session.exit_time),
            self.format_price(&session.price()),
        )
    }

    // ========================================================================
    // Quotes and exits
    // ========================================================================

    /// Formats a fee quote.
    pub fn format_quote(&self, view: &QuoteView) -> String {
        let status = view
            .status
            .map_or_else(|| "unknown".to_string(), |s| s.to_string());

        let mut lines = vec![
            format!("{} ({})", self.bold(&view.plate), view.zone),
            format!("  Status:  {status}"),
            format!("  Entered: {}", format_time(view.snapshot.entry_time)),
            format!("  Exited:  {}", format_time(view.snapshot.exit_time)),
            format!("  Fee:     {}", self.format_price(&view.price)),
            format!("  Channel: {}", self.dim(&view.channel_id)),
        ];
        if let Some(image) = &view.snapshot.image_url {
            lines.push(format!("  Photo:   {}", self.dim(image)));
        }
        lines.join("\n")
    }

    /// Formats the result of an exit.
    pub fn format_outcome(&self, outcome: &ExitOutcome) -> String {
        match outcome {
            ExitOutcome::Settled {
                plate,
                fee,
                barrier_label,
                barrier,
                shift_total,
            } => {
                let mut lines = vec![
                    format!(
                        "{} {} paid {} {CURRENCY}",
                        self.green("✓"),
                        self.bold(plate),
                        format_amount(*fee)
                    ),
                    format!("  Shift total: {} {CURRENCY}", format_amount(*shift_total)),
                ];
                if barrier.is_ok() {
                    lines.push(format!("  Barrier {barrier_label}: opened and closed"));
                } else {
                    let reason = barrier.error.as_deref().unwrap_or("unknown error");
                    lines.push(self.yellow(&format!(
                        "  Barrier {barrier_label} did not cycle ({reason}); operate it manually"
                    )));
                }
                lines.join("\n")
            }
            ExitOutcome::AlreadySettled { plate } => format!(
                "{} {} was already settled this shift; nothing collected",
                self.dim("·"),
                self.bold(plate)
            ),
            ExitOutcome::SettledElsewhere { plate, fee } => {
                let fee = fee.map_or_else(|| "unknown".to_string(), |f| {
                    format!("{} {CURRENCY}", format_amount(f))
                });
                self.yellow(&format!(
                    "{plate} was already let out elsewhere (fee {fee}); not credited to this shift"
                ))
            }
        }
    }

    // ========================================================================
    // Shift and notices
    // ========================================================================

    /// Formats the shift summary.
    pub fn format_shift(&self, summary: &ShiftSummary) -> String {
        let mut lines = vec![
            self.bold("Shift"),
            "─".repeat(40),
            format!(
                "Profit:  {}",
                self.green(&format!("{} {CURRENCY}", format_amount(summary.total)))
            ),
            format!("Settled: {} car(s)", summary.plates.len()),
        ];
        for plate in &summary.plates {
            lines.push(format!("  {plate}"));
        }
        lines.join("\n")
    }

    /// Formats one live notice, prefixed with the local time.
    pub fn format_notice(&self, notice: &Notice) -> String {
        let time = self.dim(&Local::now().format("%H:%M:%S").to_string());
        format!("{time} {}", self.format_notice_body(notice))
    }

    fn format_notice_body(&self, notice: &Notice) -> String {
        let text = notice.summary();
        if let Notice::PaymentPrompt(_) = notice {
            return self.cyan(&self.bold(&text));
        }
        match notice.level() {
            NoticeLevel::Info => text,
            NoticeLevel::Warning => self.yellow(&text),
            NoticeLevel::Error => self.red(&text),
        }
    }

    fn format_price(&self, price: &PriceDisplay) -> String {
        match price {
            PriceDisplay::NotComputed => self.dim(&price.to_string()),
            PriceDisplay::Subscription => self.cyan(&price.to_string()),
            PriceDisplay::Amount { .. } => price.to_string(),
        }
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn color_for_status(&self, status: VehicleStatus, text: &str) -> String {
        match status {
            VehicleStatus::Inside => self.green(text),
            VehicleStatus::Pending => self.yellow(text),
            VehicleStatus::Exited => self.dim(text),
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

/// Local wall-clock time, or `-` when unset.
fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map_or_else(
        || "-".to_string(),
        |t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    )
}

// ============================================================================
// Tests
// ============================================================================
