//! Line-oriented console front-end
//!
//! Parses one command per line and forwards it to the engine. Events are
//! printed by a separate task reading the broadcast mirror.

use smp_common::events::{EngineSnapshot, PlayerEvent};
use smp_common::MediaItem;
use smp_player::{InsertPosition, ItemRef, MediaPlayerEngine};

/// One console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    Seek(i64),
    Volume(i32),
    Add(String),
    Insert(usize, String),
    Remove(usize),
    Goto(usize),
    Clear,
    List,
    Status,
    Connect,
    Help,
    Quit,
}

/// What the input loop should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub const HELP: &str = "\
commands:
  play | pause | stop | next | prev
  seek <ms>          reposition within the current item
  vol <0-100>        set volume
  add <locator>      append an item
  insert <i> <loc>   insert an item at index i
  rm <i>             remove the item at index i
  goto <i>           make index i current
  clear | list | status | connect | help | quit";

fn parse_number<T: std::str::FromStr>(word: Option<&str>, what: &str) -> Result<T, String> {
    let word = word.ok_or_else(|| format!("missing {}", what))?;
    word.parse()
        .map_err(|_| format!("invalid {} '{}'", what, word))
}

/// Parse one input line; blank lines yield None
pub fn parse(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let mut words = line.split_whitespace();
    let verb = match words.next() {
        Some(verb) => verb.to_ascii_lowercase(),
        None => return Ok(None),
    };

    let command = match verb.as_str() {
        "play" => ConsoleCommand::Play,
        "pause" => ConsoleCommand::Pause,
        "stop" => ConsoleCommand::Stop,
        "next" => ConsoleCommand::Next,
        "prev" | "previous" => ConsoleCommand::Previous,
        "seek" => ConsoleCommand::Seek(parse_number(words.next(), "offset")?),
        "vol" | "volume" => ConsoleCommand::Volume(parse_number(words.next(), "volume")?),
        "add" => ConsoleCommand::Add(words.next().ok_or("missing locator")?.to_string()),
        "insert" => {
            let index = parse_number(words.next(), "index")?;
            let locator = words.next().ok_or("missing locator")?;
            ConsoleCommand::Insert(index, locator.to_string())
        }
        "rm" | "remove" => ConsoleCommand::Remove(parse_number(words.next(), "index")?),
        "goto" => ConsoleCommand::Goto(parse_number(words.next(), "index")?),
        "clear" => ConsoleCommand::Clear,
        "list" | "ls" => ConsoleCommand::List,
        "status" => ConsoleCommand::Status,
        "connect" => ConsoleCommand::Connect,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" | "q" => ConsoleCommand::Quit,
        other => return Err(format!("unknown command '{}' (try 'help')", other)),
    };
    Ok(Some(command))
}

/// Run one command against the engine, printing query results
pub async fn execute(engine: &MediaPlayerEngine, command: ConsoleCommand) -> smp_player::Result<Flow> {
    match command {
        ConsoleCommand::Play => engine.play().await?,
        ConsoleCommand::Pause => engine.pause().await?,
        ConsoleCommand::Stop => engine.stop().await?,
        ConsoleCommand::Next => {
            engine.next().await?;
        }
        ConsoleCommand::Previous => {
            engine.previous().await?;
        }
        ConsoleCommand::Seek(offset) => engine.seek(offset).await?,
        ConsoleCommand::Volume(volume) => engine.set_volume(volume).await?,
        ConsoleCommand::Add(locator) => {
            engine.enqueue(locator).await?;
        }
        ConsoleCommand::Insert(index, locator) => {
            engine
                .insert_media_item(InsertPosition::AtIndex(index), MediaItem::new(locator))
                .await?;
        }
        ConsoleCommand::Remove(index) => {
            engine.remove_media_item(ItemRef::Index(index)).await?;
        }
        ConsoleCommand::Goto(index) => engine.change_current_media_item_index(index).await?,
        ConsoleCommand::Clear => engine.clear_playlist().await,
        ConsoleCommand::List => {
            let current = engine.current_index().await;
            let items = engine.playlist_items().await;
            println!("{} ({} items)", engine.playlist_name().await, items.len());
            for (index, item) in items.iter().enumerate() {
                let marker = if Some(index) == current { ">" } else { " " };
                println!("{} {:>3}  {}", marker, index, item.locator());
            }
        }
        ConsoleCommand::Status => println!("{}", format_snapshot(&engine.snapshot().await)),
        ConsoleCommand::Connect => engine.connect().await,
        ConsoleCommand::Help => println!("{}", HELP),
        ConsoleCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

fn format_ms(ms: u64) -> String {
    let seconds = ms / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

fn item_name(item: &Option<MediaItem>) -> String {
    item.as_ref()
        .map(|i| i.display_name().to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_snapshot(snapshot: &EngineSnapshot) -> String {
    let position = match (snapshot.position_ms, snapshot.duration_ms) {
        (Some(position), Some(duration)) => {
            format!("{} / {}", format_ms(position), format_ms(duration))
        }
        (Some(position), None) => format!("{} / live", format_ms(position)),
        _ => "--:--".to_string(),
    };
    format!(
        "[{}] {} ({})  prev: {}  next: {}  vol: {}  items: {}",
        snapshot.state,
        item_name(&snapshot.current_item),
        position,
        item_name(&snapshot.previous_item),
        item_name(&snapshot.next_item),
        snapshot.volume,
        snapshot.playlist_len,
    )
}

/// Human-readable line for an event; ticks are not echoed
pub fn format_event(event: &PlayerEvent) -> Option<String> {
    let line = match event {
        PlayerEvent::ServerConnect { endpoint, .. } => format!("connected to {}", endpoint),
        PlayerEvent::ServerDisconnect {
            endpoint, reason, ..
        } => match reason {
            Some(reason) => format!("disconnected from {}: {}", endpoint, reason),
            None => format!("disconnected from {}", endpoint),
        },
        PlayerEvent::StateChangeMediaplayer {
            old_state,
            new_state,
            ..
        } => format!("state {} -> {}", old_state, new_state),
        PlayerEvent::CurrentMediaItemChanged { new, .. } => format!("current: {}", item_name(new)),
        PlayerEvent::PreviousMediaItemChanged { .. } | PlayerEvent::NextMediaItemChanged { .. } => {
            return None
        }
        PlayerEvent::PlaylistStart { playlist } => format!("playlist '{}' started", playlist),
        PlayerEvent::PlaylistEnd { playlist } => format!("playlist '{}' ended", playlist),
        PlayerEvent::MediaItemStartPlay { item } => format!("playing {}", item.display_name()),
        PlayerEvent::MediaItemEndPlay {
            item,
            position_ms,
            reached_end,
        } => format!(
            "{} {} at {}",
            if *reached_end { "finished" } else { "stopped" },
            item.display_name(),
            format_ms(*position_ms)
        ),
        PlayerEvent::MediaItemSeekStart { item, target_ms, .. } => {
            format!("seeking {} to {}", item.display_name(), format_ms(*target_ms))
        }
        PlayerEvent::MediaItemSeekEnd { item, position_ms } => {
            format!("{} now at {}", item.display_name(), format_ms(*position_ms))
        }
        PlayerEvent::Tick { .. } => return None,
    };
    Some(line)
}
