use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Result;

use fitlog_core::chat::TrainerSession;
use fitlog_core::models::{ChatMessage, ChatRole};
use fitlog_core::sync::{DisabledRemote, RemoteStore};

use crate::coach::CompletionClient;
use crate::config::Config;
use crate::remote::{HttpRemoteStore, warn_local_only};

pub(crate) async fn cmd_trainer(config: &Config, message: Option<String>) -> Result<()> {
    let backend = CompletionClient::from_config(config);

    // Without a configured backend and login the conversation still works,
    // it just is not persisted anywhere.
    let (remote, user_id): (Arc<dyn RemoteStore>, String) =
        match (HttpRemoteStore::from_config(config), config.session()) {
            (Some(remote), Some(identity)) => (Arc::new(remote), identity.id),
            (Some(_), None) => {
                eprintln!("Not logged in; this conversation will not be saved.");
                (Arc::new(DisabledRemote), "local".to_string())
            }
            (None, _) => {
                warn_local_only();
                (Arc::new(DisabledRemote), "local".to_string())
            }
        };

    let mut session = TrainerSession::open(remote, &user_id).await;
    for msg in session.messages() {
        print_message(msg);
    }

    if let Some(text) = message {
        print_prompt_line(&text);
        let reply = session.send(&backend, &text).await;
        print_message(&reply);
        session.close().await;
        return Ok(());
    }

    eprintln!("(type your question; 'exit' to leave)");
    let stdin = io::stdin();
    loop {
        eprint!("you> ");
        io::stderr().flush()?;
        let Some(line) = stdin.lock().lines().next() else {
            break;
        };
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text == "exit" || text == "quit" {
            break;
        }
        let reply = session.send(&backend, text).await;
        print_message(&reply);
    }

    session.close().await;
    Ok(())
}

fn print_message(message: &ChatMessage) {
    match message.role {
        ChatRole::User => print_prompt_line(&message.content),
        ChatRole::Assistant => println!("trainer> {}\n", message.content),
    }
}

fn print_prompt_line(content: &str) {
    println!("you> {content}");
}
