//! `typewriter` command

use std::io::Write;
use std::time::Duration;

use clap::Args;

use super::exit_codes;
use crate::typewriter::{
    default_script, AnimatedTextController, ChannelTarget, TextStyle, TypewriterTimings,
};

#[derive(Debug, Args)]
pub struct TypewriterArgs {
    /// How long to run the animation
    #[arg(long, default_value_t = 10)]
    pub seconds: u64,

    /// Sentences to type; the login slogans when omitted
    pub sentences: Vec<String>,
}

pub async fn run(args: TypewriterArgs) -> anyhow::Result<i32> {
    let script = if args.sentences.is_empty() {
        default_script()
    } else {
        args.sentences
    };

    let (tx, rx) = crossbeam_channel::unbounded();
    let controller = AnimatedTextController::start(
        script,
        TextStyle::slogan(),
        TypewriterTimings::default(),
        ChannelTarget::new(tx),
    )?;

    // Single consumer applying frames, as a UI thread would
    let printer = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut out = std::io::stdout();
        while let Ok(frame) = rx.recv() {
            write!(out, "\r\x1b[2K{}", frame.text())?;
            out.flush()?;
        }
        writeln!(out)
    });

    tokio::time::sleep(Duration::from_secs(args.seconds)).await;
    controller.shutdown().await;
    printer.await??;

    Ok(exit_codes::SUCCESS)
}
