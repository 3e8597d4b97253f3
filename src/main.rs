use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::Parser as ClapParser;
use fig_vm::{Error, Exit, Val, Vm, VmConfig};
use tracing_subscriber::EnvFilter;

fn main() {
    let opt = Opt::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = VmConfig {
        gc_threshold: opt.gc_threshold,
        stack_capacity: opt.stack_capacity,
        gc_stress: opt.gc_stress,
    };

    // evaluation recurses natively, so the vm gets a thread whose stack
    // outlasts the execution stack
    let worker = std::thread::Builder::new()
        .name("fig-vm".into())
        .stack_size(config.native_stack_size())
        .spawn(move || {
            let mut vm = Vm::with_config(config);
            // dropping the vm runs the final collection
            run(&mut vm, &opt)
        });
    let code = match worker {
        // a panicking vm has already reported itself
        Ok(handle) => handle.join().unwrap_or(101),
        Err(e) => {
            eprintln!("Failed to start the interpreter thread: {}", e);
            1
        }
    };
    std::process::exit(code)
}

/// Run the requested program and return the process exit status.
fn run(vm: &mut Vm, opt: &Opt) -> i32 {
    if let Some(stdlib) = &opt.stdlib {
        match vm.load_file(stdlib) {
            Ok(_) => {}
            Err(Error::Exit(code)) => return code,
            Err(e) => {
                eprintln!("Error while loading standard library: {}", e);
                return 1;
            }
        }
    }

    if let Some(e) = &opt.eval {
        return match vm.eval_top_level(e) {
            Ok(val) => {
                report(vm, val, false);
                0
            }
            Err(Exit(code)) => code,
        };
    }

    if let Some(f) = &opt.file {
        return match vm.load_file(f) {
            Ok(_) => 0,
            Err(Error::Exit(code)) => code,
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        };
    }

    repl(vm)
}

/// Read lines from stdin and evaluate each one.
fn repl(vm: &mut Vm) -> i32 {
    let stdin = std::io::stdin();
    let mut stdin = stdin.lock();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) => return 0,
            Ok(_) => {}
            Err(e) => {
                eprintln!("Failed to read input: {}", e);
                return 1;
            }
        }
        if line.trim().is_empty() {
            continue;
        }

        match vm.eval_top_level(&line) {
            Ok(val) => report(vm, val, true),
            Err(Exit(code)) => return code,
        }
    }
}

/// Print a top-level result. Errors go to stderr.
fn report(vm: &Vm, val: Val, arrow: bool) {
    let printed = vm.write_to_string(val);
    if vm.as_error(val).is_some() {
        eprintln!("{}", printed);
    } else if arrow {
        println!("=> {}", printed);
    } else {
        println!("{}", printed);
    }
}

#[derive(clap::Parser)]
#[clap(about, version, author)]
struct Opt {
    /// Evaluate the given file before anything else. Any error in it aborts
    /// startup.
    #[clap(long)]
    stdlib: Option<PathBuf>,

    /// Evaluate the given string and print the result.
    #[clap(short, long)]
    eval: Option<String>,

    /// Evaluate the given file.
    #[clap(short, long)]
    file: Option<PathBuf>,

    /// Number of live objects that triggers the first garbage collection.
    #[clap(long, default_value = "500")]
    gc_threshold: usize,

    /// Capacity of the execution stack.
    #[clap(long, default_value = "8192")]
    stack_capacity: usize,

    /// Collect garbage before every allocation.
    #[clap(long)]
    gc_stress: bool,
}
