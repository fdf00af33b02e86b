//! Interactive question loop and one-shot answering.
//!
//! Each question runs the full pipeline synchronously from the user's point
//! of view. A failed question prints the offending expression and the error,
//! then the loop continues.

use std::io::{self, BufRead, Write};

use sheetqa_core::{Dataset, QaPipeline, query::Value};

use crate::table;

/// Answer a single question and print the result. Returns whether it
/// succeeded.
pub async fn answer_one(pipeline: &QaPipeline, dataset: &Dataset, question: &str) -> bool {
    match pipeline.ask(dataset, question).await {
        Ok(answer) => {
            println!("\n\x1b[90mGenerated code:\x1b[0m {}", answer.expression);
            println!("\x1b[32mAnswer:\x1b[0m");
            print_value(&answer.value);
            true
        }
        Err(e) => {
            println!("\n\x1b[31mExecution failed.\x1b[0m");
            if let Some(expression) = &e.expression {
                println!("Generated code: {}", expression);
            }
            println!("Error: {}", e.source);
            false
        }
    }
}

/// Run the interactive loop until EOF or an exit command.
pub async fn run(pipeline: &QaPipeline, dataset: &Dataset) -> anyhow::Result<()> {
    println!("Ask a question about your data ('exit' to quit).\n");

    let stdin = io::stdin();
    loop {
        print!("\x1b[36m?\x1b[0m ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit" | ":q") {
            break;
        }

        answer_one(pipeline, dataset, question).await;
        println!();
    }

    Ok(())
}

fn print_value(value: &Value) {
    match value {
        Value::Table(ds) => println!("{}", table::render_dataset(ds)),
        Value::Column { .. } | Value::Series { .. } => {
            println!("{}", table::render_value(value))
        }
        scalar => println!("{}", scalar),
    }
}
