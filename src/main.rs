mod config;

use std::path::PathBuf;

use bili_api::{app, wbi, AppApi, DanmuInfo, Qn, WbiKeys, WebApi};
use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};
use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "blive", version, about = "Query the Bilibili Live app and web APIs")]
struct Cli {
    /// Config file, defaults to Conf.toml in the user config dir
    #[arg(long)]
    config: Option<PathBuf>,
    /// Session cookie, overrides the one in the config file
    #[arg(long)]
    cookie: Option<String>,
    /// Increase log verbosity, repeat for more
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a short room id
    RoomInit { room_id: u64 },
    /// Room and anchor info
    RoomInfo {
        room_id: u64,
        #[arg(long)]
        app: bool,
    },
    /// Stream urls, one entry per play info host that answered
    PlayInfo {
        room_id: u64,
        #[arg(long)]
        app: bool,
        #[arg(long, default_value_t = 10000)]
        qn: u32,
        #[arg(long)]
        only_video: bool,
        #[arg(long)]
        only_audio: bool,
    },
    /// Space info of a user
    UserInfo {
        uid: u64,
        #[arg(long)]
        app: bool,
    },
    /// Danmu server token and hosts
    DanmuInfo {
        room_id: u64,
        #[arg(long)]
        app: bool,
    },
    /// Server time
    Timestamp,
    /// Raw nav response
    Nav,
    /// Sign KEY=VALUE pairs with the app key
    SignApp { params: Vec<String> },
    /// Sign KEY=VALUE pairs with the given WBI keys
    SignWbi {
        #[arg(long)]
        img_key: String,
        #[arg(long)]
        sub_key: String,
        /// Unix seconds, defaults to now
        #[arg(long)]
        wts: Option<i64>,
        params: Vec<String>,
    },
}

fn parse_pairs(pairs: &[String]) -> Result<Value, Box<dyn std::error::Error>> {
    let mut map = Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected KEY=VALUE, got {pair}"))?;
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(Value::Object(map))
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
}

async fn run(cli: Cli, config: Config) -> Result<Value, Box<dyn std::error::Error>> {
    let client = reqwest::Client::new();
    let api_config = config.api_config();
    let app_api = AppApi::new(client.clone(), api_config.clone())?;
    let web_api = WebApi::new(client, api_config)?;
    let cookie = config.cookie.as_str();

    let output = match cli.command {
        Command::RoomInit { room_id } => web_api.room_init(room_id).await?,
        Command::RoomInfo { room_id, app } => {
            if app {
                app_api.bind_room(room_id).get_info_by_room(room_id).await?
            } else {
                web_api.bind_room(room_id).get_info_by_room(room_id).await?
            }
        }
        Command::PlayInfo {
            room_id,
            app,
            qn,
            only_video,
            only_audio,
        } => {
            let qn = Qn::try_from(qn)?;
            let infos = if app {
                app_api
                    .bind_room(room_id)
                    .get_room_play_infos(room_id, qn, only_video, only_audio)
                    .await?
            } else {
                web_api
                    .bind_room(room_id)
                    .get_room_play_infos(room_id, qn)
                    .await?
            };
            Value::Array(infos)
        }
        Command::UserInfo { uid, app } => {
            if app {
                app_api.get_user_info(uid).await?
            } else {
                web_api.get_user_info(uid, cookie).await?
            }
        }
        Command::DanmuInfo { room_id, app } => {
            let data = if app {
                app_api.bind_room(room_id).get_danmu_info(room_id).await?
            } else {
                web_api
                    .bind_room(room_id)
                    .get_danmu_info(room_id, cookie)
                    .await?
            };
            let info = DanmuInfo::from_data(data)?;
            log::info!(
                "Got {} danmu hosts for room {room_id}",
                info.host_list.len()
            );
            serde_json::to_value(info)?
        }
        Command::Timestamp => json!({ "timestamp": web_api.get_timestamp().await? }),
        Command::Nav => web_api.get_nav().await?,
        Command::SignApp { params } => serde_json::to_value(app::sign(parse_pairs(&params)?)?)?,
        Command::SignWbi {
            img_key,
            sub_key,
            wts,
            params,
        } => {
            let keys = WbiKeys::new(&img_key, &sub_key);
            let wts = wts.unwrap_or_else(|| chrono::Utc::now().timestamp());
            serde_json::to_value(wbi::sign(parse_pairs(&params)?, &keys, wts)?)?
        }
    };
    Ok(output)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let mut config = match cli.config.clone().or_else(config::default_path) {
        Some(path) => {
            log::debug!("Loading config from {}", path.display());
            Config::load(&path)?
        }
        None => Config::default(),
    };
    if let Some(cookie) = &cli.cookie {
        config.cookie = cookie.clone();
    }

    let output = run(cli, config).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
