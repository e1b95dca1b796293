use anyhow::Result;
use futures::future::{FutureExt, LocalBoxFuture};
use futures::stream::FuturesUnordered;
use std::io;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

use crate::chat::{ChatSession, SubmitOutcome};
use crate::cli::{self, INBOX_HELP, InboxCommand};
use crate::format;
use crate::inbox::{DismissOutcome, LoadOutcome, QueryInbox, SendOutcome};
use crate::types::QueryKey;

pub async fn run_chat<S>(session: &ChatSession, mut lines: S) -> Result<()>
where
    S: Stream<Item = io::Result<String>> + Unpin,
{
    println!("Ask a question (/history, /quit).");
    while let Some(line) = lines.next().await {
        let line = line?;
        match line.trim() {
            "/quit" => break,
            "/history" => {
                match format::render_transcript(&session.transcript()) {
                    Some(rendered) => println!("{rendered}"),
                    None => println!("No messages yet."),
                }
                continue;
            }
            _ => {}
        }
        match session.submit(&line).await {
            SubmitOutcome::Ignored | SubmitOutcome::Busy => continue,
            SubmitOutcome::Answered | SubmitOutcome::FellBack => {
                if let Some(turn) = session.transcript().last() {
                    println!("Assistant: {}", turn.content);
                }
            }
        }
    }
    Ok(())
}

enum InboxEvent {
    Loaded(LoadOutcome),
    Sent(QueryKey, SendOutcome),
    Dismissed(QueryKey, DismissOutcome),
}

/// Runs the operator inbox on the current task. Store and email calls are kept
/// in a set of pending operations polled next to stdin, so sends to different
/// queries overlap while the operator keeps typing.
pub async fn run_inbox<S>(inbox: &QueryInbox, mut lines: S) -> Result<()>
where
    S: Stream<Item = io::Result<String>> + Unpin,
{
    let mut pending: FuturesUnordered<LocalBoxFuture<'_, InboxEvent>> = FuturesUnordered::new();

    println!("Loading queries...");
    report(inbox, InboxEvent::Loaded(inbox.load_queries().await));

    loop {
        tokio::select! {
            biased;
            Some(event) = pending.next(), if !pending.is_empty() => report(inbox, event),
            maybe_line = lines.next() => {
                let line = match maybe_line {
                    Some(line) => line?,
                    None => break,
                };
                match cli::parse_command(&line) {
                    Ok(InboxCommand::Quit) => break,
                    Ok(command) => {
                        if let Some(op) = handle_command(inbox, command) {
                            pending.push(op);
                        }
                    }
                    Err(err) => println!("{err}"),
                }
            }
        }
    }

    if !pending.is_empty() {
        println!("Waiting for {} outstanding operation(s)...", pending.len());
    }
    while let Some(event) = pending.next().await {
        report(inbox, event);
    }
    Ok(())
}

fn handle_command<'a>(
    inbox: &'a QueryInbox,
    command: InboxCommand,
) -> Option<LocalBoxFuture<'a, InboxEvent>> {
    let queries = inbox.queries();
    let lookup = |index| match cli::resolve(&queries, index) {
        Ok(key) => Some(key),
        Err(err) => {
            println!("{err}");
            None
        }
    };

    match command {
        InboxCommand::List => {
            print_queue(inbox);
            None
        }
        InboxCommand::Show(index) => {
            let key = lookup(index)?;
            if let Some(query) = queries.iter().find(|q| q.matches(&key)) {
                print!(
                    "{}",
                    format::render_query(index, query, &inbox.draft(&key.email), inbox.is_sending(&key))
                );
            }
            None
        }
        InboxCommand::Draft { index, text } => {
            let key = lookup(index)?;
            inbox.set_draft(&key.email, text);
            println!("Draft saved for {}.", key.email);
            None
        }
        InboxCommand::Send(index) => {
            let key = lookup(index)?;
            if !inbox.can_send(&key) {
                println!("#{index} cannot be sent: write a draft first or wait for the current send.");
                return None;
            }
            println!("Sending response to {}...", key.email);
            Some(
                async move {
                    let outcome = inbox.send(&key).await;
                    InboxEvent::Sent(key, outcome)
                }
                .boxed_local(),
            )
        }
        InboxCommand::Dismiss(index) => {
            let key = lookup(index)?;
            Some(
                async move {
                    let outcome = inbox.dismiss(&key).await;
                    InboxEvent::Dismissed(key, outcome)
                }
                .boxed_local(),
            )
        }
        InboxCommand::Reload => Some(
            async move { InboxEvent::Loaded(inbox.load_queries().await) }.boxed_local(),
        ),
        InboxCommand::Stats => {
            println!("{}", format::render_stats(&inbox.stats()));
            None
        }
        InboxCommand::Help => {
            println!("{INBOX_HELP}");
            None
        }
        InboxCommand::Quit => None,
    }
}

fn report(inbox: &QueryInbox, event: InboxEvent) {
    match event {
        InboxEvent::Loaded(LoadOutcome::Replaced { count }) => {
            debug!(count, "console: queue replaced");
            print_queue(inbox);
        }
        InboxEvent::Loaded(LoadOutcome::Kept) => print_queue(inbox),
        InboxEvent::Sent(key, SendOutcome::Retired { .. }) => {
            println!("Response sent to {}.", key.email);
        }
        InboxEvent::Sent(key, SendOutcome::Rejected(reason)) => {
            println!("Not sent to {}: {reason}.", key.email);
        }
        InboxEvent::Sent(_, SendOutcome::DeliveryFailed(notice)) => println!("{notice}"),
        InboxEvent::Dismissed(key, DismissOutcome::Dismissed) => {
            println!("Dismissed query from {}.", key.email);
        }
        InboxEvent::Dismissed(_, DismissOutcome::Reconciled { notice, .. }) => {
            println!("{notice}");
            print_queue(inbox);
        }
        InboxEvent::Dismissed(key, DismissOutcome::SendInFlight) => {
            println!("Cannot dismiss {} while a response is sending.", key.email);
        }
    }
}

fn print_queue(inbox: &QueryInbox) {
    let queries = inbox.queries();
    println!("{} Pending", queries.len());
    if queries.is_empty() {
        println!("No pending queries.");
        return;
    }
    for (i, query) in queries.iter().enumerate() {
        let key = query.key();
        print!(
            "{}",
            format::render_query(i + 1, query, &inbox.draft(&query.email), inbox.is_sending(&key))
        );
    }
}
