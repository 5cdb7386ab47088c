extern crate ansi_term;
extern crate ctrlc;
extern crate linefeed;

use ansi_term::Style;
use linefeed::{Interface, ReadResult};
use rpl::mach::{object, runtime, state, Runtime};

// Simulator front-end: a line-oriented terminal stand-in for the
// calculator keyboard and screen. Flags mirror the on-device test
// driver; unknown flags are ignored. A bare argument names a state
// file loaded at startup and saved back on exit, the way the device
// persists its state at power-off.

struct Options {
    memory: usize,
    traces: String,
    state_file: Option<String>,
}

fn parse_args() -> Options {
    let mut options = Options {
        memory: runtime::DEFAULT_MEMORY,
        traces: String::new(),
        state_file: None,
    };
    for arg in std::env::args().skip(1) {
        if let Some(value) = arg.strip_prefix("-m") {
            if let Ok(kb) = value.parse::<usize>() {
                options.memory = kb * 1024;
            }
        } else if let Some(value) = arg.strip_prefix("-t") {
            options.traces = value.to_string();
        } else if arg.starts_with('-') {
            // Other simulator flags (timing, keymaps, test selection)
            // belong to the platform layer and are accepted silently
        } else {
            options.state_file = Some(arg);
        }
    }
    options
}

pub fn main() {
    let options = parse_args();
    let mut rt = Runtime::new(options.memory);
    if !options.traces.is_empty() {
        rt.trace.set_pattern(&options.traces);
    }

    let interrupted = rt.interrupt_flag();
    if ctrlc::set_handler(move || {
        interrupted.store(true, std::sync::atomic::Ordering::SeqCst);
    })
    .is_err()
    {
        eprintln!("warning: no interrupt handler");
    }

    if let Some(filename) = &options.state_file {
        if let Err(error) = state::load(&mut rt, filename) {
            println!("{}", Style::new().bold().paint(error.to_string()));
        }
    }

    if let Err(error) = main_loop(&mut rt) {
        eprintln!("{}", error);
    }

    if let Some(filename) = &options.state_file {
        if let Err(error) = state::save(&rt, filename) {
            eprintln!("{}", error);
        }
    }
}

fn main_loop(rt: &mut Runtime) -> std::io::Result<()> {
    let command = Interface::new("RPL")?;
    command.set_prompt("> ")?;
    loop {
        match command.read_line()? {
            ReadResult::Input(line) => {
                if let Some(topic) = line.strip_prefix('?') {
                    show_help(topic.trim(), &command)?;
                    continue;
                }
                if let Err(error) = rt.enter(&line) {
                    let mut message = error.to_string();
                    if let Some(position) = error.position() {
                        message.push_str(&format!(" at {}", position));
                    }
                    command.write_fmt(format_args!(
                        "{}\n",
                        Style::new().bold().paint(message)
                    ))?;
                } else {
                    command.add_history_unique(line);
                }
                show_stack(rt, &command)?;
            }
            ReadResult::Signal(_) | ReadResult::Eof => return Ok(()),
        }
    }
}

/// `?name` looks a word up in the dispatch table: its help topic and,
/// for the structured objects, the editor template.
fn show_help(
    topic: &str,
    command: &Interface<linefeed::DefaultTerminal>,
) -> std::io::Result<()> {
    for id in object::all_ids() {
        let ops = object::ops(id);
        if ops.name.eq_ignore_ascii_case(topic) {
            command.write_fmt(format_args!("{}: {}", ops.name, ops.help))?;
            if !ops.insert.is_empty() {
                command.write_fmt(format_args!("  (editor: {})", ops.insert))?;
            }
            if ops.marker != ' ' {
                command.write_fmt(format_args!("  {}", ops.marker))?;
            }
            command.write_fmt(format_args!("\n"))?;
            return Ok(());
        }
    }
    command.write_fmt(format_args!("No help for {}\n", topic))?;
    Ok(())
}

/// The top of the operand stack, deepest shown first, like the screen
/// of the real machine.
fn show_stack(
    rt: &Runtime,
    command: &Interface<linefeed::DefaultTerminal>,
) -> std::io::Result<()> {
    let depth = rt.depth();
    let shown = depth.min(4);
    for level in (0..shown).rev() {
        let text = match rt.peek(level) {
            Ok(obj) => rt
                .render_obj(obj)
                .unwrap_or_else(|e| format!("<{}>", e)),
            Err(e) => format!("<{}>", e),
        };
        command.write_fmt(format_args!("{}: {}\n", level + 1, text))?;
    }
    Ok(())
}
