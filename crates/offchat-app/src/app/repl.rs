use anyhow::{Context, Result};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;

use offchat_chat::{ChatExchange, ConversationManager};
use offchat_llm_api::InferenceError;
use offchat_logging::ConversationLogger;
use offchat_types::TRIM_KEEP_TURNS;

use crate::app::setup::{print_model_info, InferenceBackend};
use crate::config::OffchatConfig;

/// What a line typed at the prompt asks for
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Quit,
    Clear,
    Message(&'a str),
}

fn parse_repl_command(input: &str) -> ReplCommand<'_> {
    match input.to_lowercase().as_str() {
        "quit" | "exit" | "q" => ReplCommand::Quit,
        "clear" => ReplCommand::Clear,
        _ => ReplCommand::Message(input),
    }
}

/// Run interactive REPL mode
pub async fn run_repl_mode(config: OffchatConfig, verbose: bool) -> Result<()> {
    println!("{}", "Initializing offchat...".cyan());

    if let Err(e) = config.validate() {
        eprintln!("{} {}", "Config error:".red().bold(), e);
        return Err(e).context("Invalid configuration");
    }
    print_model_info(&config);

    let backend = InferenceBackend::start(&config, verbose).await?;
    println!("{}", "✓ Ready!".green());

    let logger = match ConversationLogger::new(&config.log_dir).await {
        Ok(l) => Some(l),
        Err(e) => {
            eprintln!("Logging disabled: {}", e);
            None
        }
    };

    let exchange = ChatExchange::new(backend.client(), config.generation_params());
    let mut history = ConversationManager::new(config.history_max_turns);

    println!("\n{}", "🤖 OFFLINE CHAT AI".bright_cyan().bold());
    println!("{}", "=".repeat(40).cyan());
    println!("{}", "Type 'quit' to exit, 'clear' to clear the history".yellow());
    println!("{}\n", "=".repeat(40).cyan());

    let mut rl = DefaultEditor::new()?;

    loop {
        let readline = rl.readline(&format!("{} ", "You:".bright_blue().bold()));

        match readline {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(input);

                match parse_repl_command(input) {
                    ReplCommand::Quit => {
                        println!("{}", "Goodbye! 👋".yellow());
                        break;
                    }
                    ReplCommand::Clear => {
                        history.clear_history();
                        println!("{}", "✓ History cleared".green());
                    }
                    ReplCommand::Message(message) => {
                        let result = process_user_input(
                            &exchange,
                            &mut history,
                            logger.as_ref(),
                            message,
                            config.stream,
                        )
                        .await;
                        if let Err(e) = result {
                            eprintln!("{} {}", "Error:".red().bold(), e);
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("\n{}", "Goodbye! 👋".yellow());
                break;
            }
            Err(e) => {
                eprintln!("{} {}", "Input error:".red(), e);
                break;
            }
        }
    }

    backend.shutdown().await;
    Ok(())
}

/// One exchange: generate, print, log, then keep the buffer short
async fn process_user_input(
    exchange: &ChatExchange,
    history: &mut ConversationManager,
    logger: Option<&ConversationLogger>,
    user_input: &str,
    stream: bool,
) -> Result<(), InferenceError> {
    println!("{}", "🤖 AI is thinking...".cyan());

    let response = if stream {
        print!("{} ", "🤖 AI:".green().bold());
        let _ = std::io::stdout().flush();
        let response = exchange
            .respond_streaming(history, user_input, |fragment| {
                print!("{}", fragment);
                let _ = std::io::stdout().flush();
            })
            .await?;
        println!();
        response
    } else {
        let response = exchange.respond(history, user_input).await?;
        println!("{} {}", "🤖 AI:".green().bold(), response);
        response
    };

    if let Some(logger) = logger {
        logger.log_exchange(user_input, &response).await;
    }

    if history.is_history_full() {
        history.trim_history(TRIM_KEEP_TURNS);
    }

    Ok(())
}
