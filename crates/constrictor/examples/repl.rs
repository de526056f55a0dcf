//! A minimal line REPL over the bridge.
//!
//! Incomplete input (an open brace, an unfinished function) is buffered
//! until it parses as a complete compilable unit, then evaluated; results
//! come back as host values and print with their host type.

use std::io::{BufRead, Write};

use constrictor::{HostValue, Runtime};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut rt = Runtime::new()?;
    let stdin = std::io::stdin();
    let mut buffer = String::new();

    print!("> ");
    std::io::stdout().flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        buffer.push_str(&line);
        buffer.push('\n');

        if !rt.is_compilable_unit(&buffer) {
            print!("… ");
            std::io::stdout().flush()?;
            continue;
        }

        match rt.eval(&buffer) {
            Ok(HostValue::None) => {}
            Ok(HostValue::Future(future)) => match rt.block_on(&future) {
                Ok(value) => println!("{value:?}"),
                Err(err) => eprintln!("{err}"),
            },
            Ok(value) => println!("{value:?}"),
            Err(err) => eprintln!("{err}"),
        }
        rt.wait();

        buffer.clear();
        print!("> ");
        std::io::stdout().flush()?;
    }
    Ok(())
}
