use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::{
    db::ScanRecord,
    history::HistoryBrowser,
    intake::{IntakeController, ScanOutcome},
};

type InputLines = Lines<BufReader<Stdin>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Counter,
    History,
}

/// Line-oriented front end: the counter view treats any entered line as
/// scanner input (guns terminate with Enter, which doubles as the manual
/// submit), while named commands switch views and drive deletes, batch
/// finishing, and report export. Destructive commands are confirmation-gated.
pub struct Shell {
    intake: IntakeController,
    history: HistoryBrowser,
    export_dir: PathBuf,
    view: View,
}

impl Shell {
    pub fn new(intake: IntakeController, history: HistoryBrowser, export_dir: PathBuf) -> Self {
        Self {
            intake,
            history,
            export_dir,
            view: View::Counter,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.print_counter().await;
        println!("{}", "Scan a key, or type `help` for commands.".dimmed());

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        self.prompt()?;

        while let Some(line) = lines.next_line().await? {
            let quit = match self.view {
                View::Counter => self.handle_counter_line(line.trim(), &mut lines).await?,
                View::History => self.handle_history_line(line.trim(), &mut lines).await?,
            };
            if quit {
                break;
            }
            self.prompt()?;
        }

        Ok(())
    }

    fn prompt(&self) -> Result<()> {
        let marker = match self.view {
            View::Counter => "scan> ",
            View::History => "history> ",
        };
        print!("{}", marker.bold());
        io::stdout().flush()?;
        Ok(())
    }

    async fn handle_counter_line(&mut self, line: &str, lines: &mut InputLines) -> Result<bool> {
        match line {
            "" => {}
            "quit" | "exit" => return Ok(true),
            "help" => print_counter_help(),
            "list" => self.print_counter().await,
            "history" => {
                self.view = View::History;
                let date = self.history.snapshot().await.selected_date;
                if let Err(err) = self.history.load_for_date(date).await {
                    blocking_notice(&format!("Failed to load history: {err}"), lines).await?;
                }
                self.print_history().await;
            }
            "finish" => {
                let confirmed = confirm(
                    lines,
                    "Finish today's count? The counter is zeroed and the list cleared from view.",
                )
                .await?;
                if confirmed {
                    self.intake.finish_day().await?;
                    println!("{}", "Count finished. A new batch has started.".green().bold());
                }
            }
            other if other.starts_with("del ") => {
                self.delete_from_counter(other[4..].trim(), lines).await?;
            }
            other => {
                // Scanner input: strip everything that is not a digit, the
                // same sanitization the input field applies as keys are typed.
                let digits: String = other.chars().filter(|c| c.is_ascii_digit()).collect();
                match self.intake.submit_scan(&digits).await {
                    Ok(outcome) => self.print_feedback(outcome).await,
                    Err(err) => {
                        blocking_notice(
                            &format!("Unexpected failure while saving the scan: {err}"),
                            lines,
                        )
                        .await?;
                    }
                }
            }
        }
        Ok(false)
    }

    async fn delete_from_counter(&self, target: &str, lines: &mut InputLines) -> Result<()> {
        let records = self.intake.snapshot().await.records;
        let Some(id) = resolve_target(&records, target) else {
            println!("{}", "No such record.".red());
            return Ok(());
        };

        let confirmed = confirm(
            lines,
            "Delete this record? The count will be updated.",
        )
        .await?;
        if !confirmed {
            return Ok(());
        }

        match self.intake.remove_record(&id).await {
            Ok(()) => self.print_counter().await,
            Err(err) => {
                blocking_notice(&format!("Failed to delete record: {err}"), lines).await?;
            }
        }
        Ok(())
    }

    async fn handle_history_line(&mut self, line: &str, lines: &mut InputLines) -> Result<bool> {
        match line {
            "" => {}
            "quit" | "exit" => return Ok(true),
            "help" => print_history_help(),
            "list" => self.print_history().await,
            "back" => {
                self.view = View::Counter;
                self.print_counter().await;
            }
            "export" => match self.history.export_report(&self.export_dir).await {
                Ok(path) => {
                    println!("{} {}", "Report written to".green(), path.display());
                }
                Err(err) => {
                    blocking_notice(&format!("Failed to export report: {err}"), lines).await?;
                }
            },
            "delall" => {
                let snapshot = self.history.snapshot().await;
                let message = format!(
                    "Delete ALL {} records for {}? This action cannot be undone.",
                    snapshot.total_count,
                    snapshot.selected_date.format("%d/%m/%Y"),
                );
                if confirm(lines, &message).await? {
                    match self.history.delete_all_for_date(snapshot.selected_date).await {
                        Ok(deleted) => {
                            println!("{}", format!("Deleted {deleted} records.").green());
                        }
                        Err(err) => {
                            blocking_notice(&format!("Failed to delete records: {err}"), lines)
                                .await?;
                        }
                    }
                }
            }
            other if other.starts_with("date ") => {
                match other[5..].trim().parse::<NaiveDate>() {
                    Ok(date) => {
                        if let Err(err) = self.history.load_for_date(date).await {
                            blocking_notice(&format!("Failed to load history: {err}"), lines)
                                .await?;
                        }
                        self.print_history().await;
                    }
                    Err(_) => println!("{}", "Expected a date like 2024-03-05.".red()),
                }
            }
            other if other.starts_with("del ") => {
                self.delete_from_history(other[4..].trim(), lines).await?;
            }
            _ => println!("{}", "Unknown command; type `help`.".red()),
        }
        Ok(false)
    }

    async fn delete_from_history(&self, target: &str, lines: &mut InputLines) -> Result<()> {
        let records = self.history.snapshot().await.records;
        let Some(id) = resolve_target(&records, target) else {
            println!("{}", "No such record.".red());
            return Ok(());
        };

        let confirmed = confirm(
            lines,
            "Delete this specific record? This action cannot be undone.",
        )
        .await?;
        if !confirmed {
            return Ok(());
        }

        match self.history.delete_one(&id).await {
            Ok(()) => self.print_history().await,
            Err(err) => {
                blocking_notice(&format!("Failed to delete record: {err}"), lines).await?;
            }
        }
        Ok(())
    }

    async fn print_feedback(&self, outcome: ScanOutcome) {
        let snapshot = self.intake.snapshot().await;
        match outcome {
            ScanOutcome::Counted => {
                println!(
                    "{}  {}",
                    "✔ Counted.".green().bold(),
                    format!("Total: {}", snapshot.count).bold(),
                );
            }
            ScanOutcome::Duplicate => {
                println!("{}", "KEY ALREADY REGISTERED".red().bold());
            }
            ScanOutcome::Invalid => {
                println!("{}", "INVALID CODE (44 digits required)".red().bold());
            }
            ScanOutcome::Failed => {
                println!("{}", "Failed to store the scan; it was not counted.".red());
            }
            ScanOutcome::Ignored => {
                println!("{}", "No digits in input; nothing scanned.".dimmed());
            }
        }
    }

    async fn print_counter(&self) {
        let snapshot = self.intake.snapshot().await;
        println!();
        println!(
            "{} {}",
            "Packages counted:".bold(),
            snapshot.count.to_string().green().bold(),
        );
        println!(
            "{}",
            format!("Batch started {}", snapshot.session_start.format("%d/%m/%Y %H:%M")).dimmed(),
        );
        print_records(&snapshot.records);
    }

    async fn print_history(&self) {
        let snapshot = self.history.snapshot().await;
        println!();
        println!(
            "{} {}  {} {}",
            "History for".bold(),
            snapshot.selected_date.format("%d/%m/%Y").to_string().bold(),
            "Total records:".bold(),
            snapshot.total_count.to_string().green().bold(),
        );
        print_records(&snapshot.records);
    }
}

fn print_records(records: &[ScanRecord]) {
    if records.is_empty() {
        println!("{}", "No records.".dimmed());
        return;
    }
    for (index, record) in records.iter().enumerate() {
        println!(
            "{:>4}. {}  {}",
            index + 1,
            record.created_at.format("%H:%M:%S").to_string().dimmed(),
            record.nfe_key,
        );
    }
}

/// Resolves a `del` argument: a 1-based row number from the last listing, or
/// a full record id.
fn resolve_target(records: &[ScanRecord], target: &str) -> Option<String> {
    if let Ok(index) = target.parse::<usize>() {
        if index >= 1 && index <= records.len() {
            return Some(records[index - 1].id.clone());
        }
        return None;
    }
    records
        .iter()
        .find(|r| r.id == target)
        .map(|r| r.id.clone())
}

async fn confirm(lines: &mut InputLines, message: &str) -> Result<bool> {
    println!("{} {}", message.yellow().bold(), "[y/N]".dimmed());
    print!("> ");
    io::stdout().flush()?;
    match lines.next_line().await? {
        Some(answer) => Ok(matches!(
            answer.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        )),
        None => Ok(false),
    }
}

/// Terminal stand-in for a blocking alert: the operator must acknowledge
/// before scanning continues.
async fn blocking_notice(message: &str, lines: &mut InputLines) -> Result<()> {
    eprintln!("{}", message.red().bold());
    eprintln!("{}", "Press Enter to continue.".dimmed());
    let _ = lines.next_line().await?;
    Ok(())
}

fn print_counter_help() {
    println!("Counter view:");
    println!("  <digits>    scan a key (44 digits count a package)");
    println!("  list        show the current batch");
    println!("  del <n|id>  delete a record from the batch");
    println!("  finish      finish today's count and start a new batch");
    println!("  history     open the history view");
    println!("  quit        exit");
}

fn print_history_help() {
    println!("History view:");
    println!("  date <YYYY-MM-DD>  load records for a date");
    println!("  list               show the loaded records");
    println!("  del <n|id>         delete one record");
    println!("  delall             delete every record for the loaded date");
    println!("  export             write the report for the loaded date");
    println!("  back               return to the counter");
    println!("  quit               exit");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: &str) -> ScanRecord {
        let mut record = ScanRecord::pending(&"3".repeat(44), Utc::now());
        record.id = id.to_string();
        record
    }

    #[test]
    fn targets_resolve_by_row_number_or_id() {
        let records = vec![record("aaa"), record("bbb")];
        assert_eq!(resolve_target(&records, "1"), Some("aaa".into()));
        assert_eq!(resolve_target(&records, "2"), Some("bbb".into()));
        assert_eq!(resolve_target(&records, "bbb"), Some("bbb".into()));
        assert_eq!(resolve_target(&records, "3"), None);
        assert_eq!(resolve_target(&records, "zzz"), None);
    }
}
