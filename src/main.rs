mod calendar;
mod cli;
mod commands;
mod config;
mod index;
mod model;
mod navigation;
mod render;
mod service;
mod session;
mod storage;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = cli::Cli::parse();
    let global = args.global;
    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::Add {
            title,
            category,
            due,
            priority,
            description,
        } => commands::add(&global, title, category, due, priority, description),
        cli::Command::List => commands::list(&global),
        cli::Command::Calendar { year, month } => commands::calendar(&global, year, month),
        cli::Command::Day { date } => commands::day(&global, date),
        cli::Command::Toggle { id } => commands::toggle(&global, id),
        cli::Command::Complete { id, reopen } => commands::complete(&global, id, reopen),
        cli::Command::Delete { id } => commands::delete(&global, id),
        cli::Command::Tui => commands::tui(&global),
    }
}
