use std::io as stdio;
use std::io::{stdout, Write};

use tokio::io;
use tokio::select;
use tokio::sync::mpsc;

use tokio_stream::StreamExt;
use tokio_util::codec::{FramedRead, LinesCodec};

use tracing::{error, info, Level};
use tracing_subscriber::fmt;

use protocol::{Package, PackageType, HUB_ID};

use client::client::Client;

const GREETINGS: &str = "$ Welcome to the shared board! \n$ Commands: \\quit";
const DEFAULT_ADDRESS: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "4321";
const DEFAULT_NAME: &str = "unknown";

const LINES_MAX_LEN: usize = 256;

#[tokio::main]
async fn main() -> io::Result<()> {
    fmt()
        .compact() // use abbreviated log format
        .with_max_level(Level::INFO)
        .init();

    println!("{}", GREETINGS);

    let address = read_sync_user_input("$ Hub address (127.0.0.1):", DEFAULT_ADDRESS)?;
    let port = read_sync_user_input("$ Hub port (4321):", DEFAULT_PORT)?;
    let username = read_sync_user_input("$ Please input chat name:", DEFAULT_NAME)?;

    let mut client = match Client::connect(&address, &port).await {
        Ok(client) => client,
        Err(e) => {
            error!("{}", e);
            return Ok(());
        }
    };

    if let Err(e) = client.handshake(&username, true).await {
        error!("{}", e);
        return Ok(());
    }

    println!(">>> Registered as name: {}, id is {}", &username, client.id());

    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<Package>();
    client.spawn_read(events_tx);
    client.spawn_write();

    let mut lines = FramedRead::new(
        tokio::io::stdin(),
        LinesCodec::new_with_max_length(LINES_MAX_LEN),
    );

    loop {
        select! {
            event = events_rx.recv() => {
                match event {
                    Some(package) => render(&package),
                    None => {
                        println!(">>> Hub connection closed");
                        break;
                    }
                }
            }
            line = lines.next() => {
                match line {
                    Some(Ok(line)) if line == "\\quit" => {
                        info!("Session terminated by user...");
                        client.stop();
                        break;
                    }
                    Some(Ok(line)) if !line.is_empty() => {
                        if client.submit(Package::text(client.id(), &line)).is_err() {
                            println!(">>> Hub connection closed");
                            break;
                        }
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        error!("unable to read command line input: {}", e);
                        client.stop();
                        break;
                    }
                    None => {
                        client.stop();
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

// blocking function to gather user input from std::io::stdin
fn read_sync_user_input(prompt: &str, default: &str) -> io::Result<String> {
    let mut buf = String::new();

    print!("{} ", prompt);
    stdout().flush()?; // Since stdout is line buffered need to explicitly flush
    stdio::stdin().read_line(&mut buf)?;

    let value = buf.trim_end();
    if value.is_empty() {
        Ok(default.to_owned())
    } else {
        Ok(value.to_owned())
    }
}

// chat goes to the chat sink, strokes to the board sink -- here both are
// the terminal
fn render(package: &Package) {
    match package.package_type() {
        PackageType::TextMessage => match package.chat_text() {
            Ok(text) if package.sender_id() == HUB_ID => println!(">>> {}", text.message),
            Ok(text) => println!("> {}", text.message),
            Err(e) => error!("undisplayable chat package: {}", e),
        },
        PackageType::BoardUpdate => match package.stroke() {
            Ok(stroke) => println!(
                ">>> [board] {} points from {}",
                stroke.number_of_points,
                package.sender_id()
            ),
            Err(e) => error!("undisplayable board package: {}", e),
        },
        PackageType::Handshake => {}
    }
}
