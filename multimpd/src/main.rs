use clap::{ColorChoice, Parser};
use colored::Colorize;
use kdam::term;
use multimpd::{Args, Logger};
use requestty::symbols;
use std::{
    io::{IsTerminal, stderr},
    process,
};

fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let color = match args.color {
        ColorChoice::Always => true,
        ColorChoice::Auto => stderr().is_terminal(),
        ColorChoice::Never => false,
    };
    term::init(color);
    colored::control::set_override(color);

    Logger::init(args.log_level)?;
    args.execute()
}

fn main() {
    let mut symbols = symbols::UNICODE;
    symbols.completed = '•';
    symbols.cross = 'x';
    symbols::set(symbols);

    if let Err(e) = run() {
        eprintln!("{}: {}", "error".bold().red(), e);
        process::exit(1);
    }
}
