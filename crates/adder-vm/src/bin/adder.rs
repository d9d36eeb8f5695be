// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The `adder` driver: run a script or start the REPL.

use adder_vm::{Input, Vm, repl};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit code for invalid command lines, per sysexits.
const EX_USAGE: u8 = 64;

/// Adder interpreter.
#[derive(Parser, Debug)]
#[command(name = "adder", version, about = "The Adder interpreter")]
struct Args {
    /// Script to execute; starts a REPL when omitted.
    script: Option<PathBuf>,
    /// Directory to load the bundled library from.
    #[arg(short = 'l', value_name = "DIR")]
    lib_dir: Option<PathBuf>,
    /// Log each executed instruction and frame transition.
    #[arg(long = "le")]
    log_exec: bool,
    /// Log frame transitions only.
    #[arg(long = "lf")]
    log_frames: bool,
    /// Log GC phases.
    #[arg(long = "lg")]
    log_gc: bool,
}

fn main() -> ExitCode {
    // Accept the traditional single-dash spellings of the log flags.
    let argv = std::env::args().map(|arg| match arg.as_str() {
        "-le" => String::from("--le"),
        "-lf" => String::from("--lf"),
        "-lg" => String::from("--lg"),
        _ => arg,
    });
    let args = match Args::try_parse_from(argv) {
        Ok(args) => args,
        Err(error) => {
            let _ = error.print();
            return ExitCode::from(EX_USAGE);
        }
    };

    init_logging(&args);
    match run(&args) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("adder: {error}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(args: &Args) {
    let mut directives = vec![String::from("warn")];
    if args.log_exec {
        directives.push(String::from("adder::instr=trace"));
        directives.push(String::from("adder::frame=trace"));
    }
    if args.log_frames {
        directives.push(String::from("adder::frame=trace"));
    }
    if args.log_gc {
        directives.push(String::from("adder::gc=debug"));
    }
    let filter = EnvFilter::try_new(directives.join(","))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<ExitCode> {
    let mut vm = Vm::new();
    if let Some(lib_dir) = &args.lib_dir {
        vm.set_lib_dir(lib_dir.clone());
    }
    if vm.load_builtin_library().is_err() {
        if let Some(report) = vm.take_exception_report() {
            eprintln!("{report}");
        }
        return Ok(ExitCode::FAILURE);
    }

    let Some(script) = &args.script else {
        repl::run(&mut vm);
        return Ok(ExitCode::SUCCESS);
    };

    if let Some(parent) = script.parent() {
        vm.set_main_dir(parent.to_path_buf());
    }
    let text = std::fs::read_to_string(script)?;
    let input = Input::new(script.display().to_string(), text);
    let module = vm.new_module("__main__");
    match vm.run_source(&input, module) {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(_) => {
            if let Some(report) = vm.take_exception_report() {
                eprintln!("{report}");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
