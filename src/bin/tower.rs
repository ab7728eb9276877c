#[macro_use]
extern crate slog;

use chrono::{DateTime, Duration, Utc};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use std::env::current_dir;
use std::path::PathBuf;
use std::process::exit;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower::{Decimal, Error, Sweeper, Tower, TowerConfig, Value};

type CliResult<T> = std::result::Result<T, failure::Error>;

fn key_arg() -> Arg<'static, 'static> {
    Arg::with_name("KEY").help("A string key").required(true)
}

fn type_arg() -> Arg<'static, 'static> {
    Arg::with_name("type")
        .long("type")
        .short("t")
        .help("How to parse the value")
        .takes_value(true)
        .possible_values(&["string", "int", "float", "decimal", "bool"])
        .default_value("string")
}

fn app() -> App<'static, 'static> {
    App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .setting(AppSettings::DisableHelpSubcommand)
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .setting(AppSettings::VersionlessSubcommands)
        .arg(
            Arg::with_name("config")
                .long("config")
                .value_name("FILE")
                .help("A RON configuration file")
                .takes_value(true)
                .global(true),
        )
        .arg(
            Arg::with_name("path")
                .long("path")
                .value_name("DIR")
                .help("Directory holding the database [default: current directory]")
                .takes_value(true)
                .global(true),
        )
        .subcommand(
            SubCommand::with_name("get")
                .about("Print the value of a key")
                .arg(key_arg()),
        )
        .subcommand(
            SubCommand::with_name("set")
                .about("Set a key to a scalar value")
                .arg(key_arg())
                .arg(Arg::with_name("VALUE").required(true))
                .arg(type_arg()),
        )
        .subcommand(
            SubCommand::with_name("del")
                .about("Delete a key and everything stored under it")
                .arg(key_arg()),
        )
        .subcommand(
            SubCommand::with_name("exists")
                .about("Print whether a key exists")
                .arg(key_arg()),
        )
        .subcommand(
            SubCommand::with_name("incr")
                .about("Add to an integer key")
                .arg(key_arg())
                .arg(Arg::with_name("BY").default_value("1")),
        )
        .subcommand(
            SubCommand::with_name("lpush")
                .about("Push values onto the left of a list")
                .arg(key_arg())
                .arg(Arg::with_name("VALUE").required(true).multiple(true))
                .arg(type_arg()),
        )
        .subcommand(
            SubCommand::with_name("rpush")
                .about("Push values onto the right of a list")
                .arg(key_arg())
                .arg(Arg::with_name("VALUE").required(true).multiple(true))
                .arg(type_arg()),
        )
        .subcommand(
            SubCommand::with_name("lpop")
                .about("Pop the leftmost value of a list")
                .arg(key_arg()),
        )
        .subcommand(
            SubCommand::with_name("rpop")
                .about("Pop the rightmost value of a list")
                .arg(key_arg()),
        )
        .subcommand(
            SubCommand::with_name("lrange")
                .about("Print list items from START to END inclusive")
                .setting(AppSettings::AllowNegativeNumbers)
                .arg(key_arg())
                .arg(Arg::with_name("START").default_value("0").allow_hyphen_values(true))
                .arg(Arg::with_name("END").default_value("-1").allow_hyphen_values(true)),
        )
        .subcommand(
            SubCommand::with_name("llen")
                .about("Print the length of a list")
                .arg(key_arg()),
        )
        .subcommand(
            SubCommand::with_name("hset")
                .about("Set a map field")
                .arg(key_arg())
                .arg(Arg::with_name("FIELD").required(true))
                .arg(Arg::with_name("VALUE").required(true))
                .arg(type_arg()),
        )
        .subcommand(
            SubCommand::with_name("hget")
                .about("Print a map field")
                .arg(key_arg())
                .arg(Arg::with_name("FIELD").required(true)),
        )
        .subcommand(
            SubCommand::with_name("hdel")
                .about("Remove a map field")
                .arg(key_arg())
                .arg(Arg::with_name("FIELD").required(true)),
        )
        .subcommand(
            SubCommand::with_name("hkeys")
                .about("Print the fields of a map")
                .arg(key_arg()),
        )
        .subcommand(
            SubCommand::with_name("sadd")
                .about("Add members to a set")
                .arg(key_arg())
                .arg(Arg::with_name("MEMBER").required(true).multiple(true)),
        )
        .subcommand(
            SubCommand::with_name("srem")
                .about("Remove a member from a set")
                .arg(key_arg())
                .arg(Arg::with_name("MEMBER").required(true)),
        )
        .subcommand(
            SubCommand::with_name("sismember")
                .about("Print whether a member is in a set")
                .arg(key_arg())
                .arg(Arg::with_name("MEMBER").required(true)),
        )
        .subcommand(
            SubCommand::with_name("scard")
                .about("Print the number of members of a set")
                .arg(key_arg()),
        )
        .subcommand(
            SubCommand::with_name("bfadd")
                .about("Add an item to a membership filter")
                .arg(key_arg())
                .arg(Arg::with_name("ITEM").required(true))
                .arg(
                    Arg::with_name("slots")
                        .long("slots")
                        .help("Hashes per item when the filter is created (3 to 5)")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("bfexists")
                .about("Print whether an item was added to a membership filter")
                .arg(key_arg())
                .arg(Arg::with_name("ITEM").required(true)),
        )
        .subcommand(
            SubCommand::with_name("tsadd")
                .about("Record a point in a time series")
                .arg(key_arg())
                .arg(Arg::with_name("TIME").help("RFC 3339 timestamp").required(true))
                .arg(Arg::with_name("VALUE").required(true))
                .arg(type_arg()),
        )
        .subcommand(
            SubCommand::with_name("tsrange")
                .about("Print the points of a time series between FROM and TO inclusive")
                .arg(key_arg())
                .arg(Arg::with_name("FROM").required(true))
                .arg(Arg::with_name("TO").required(true)),
        )
        .subcommand(
            SubCommand::with_name("expire")
                .about("Expire a key after SECONDS")
                .arg(key_arg())
                .arg(Arg::with_name("SECONDS").required(true)),
        )
        .subcommand(
            SubCommand::with_name("persist")
                .about("Remove the expiry of a key")
                .arg(key_arg()),
        )
        .subcommand(
            SubCommand::with_name("ttl")
                .about("Print when a key expires")
                .arg(key_arg()),
        )
        .subcommand(
            SubCommand::with_name("sweep")
                .about("Delete expired keys")
                .arg(
                    Arg::with_name("watch")
                        .long("watch")
                        .help("Keep sweeping until interrupted"),
                ),
        )
        .subcommand(
            SubCommand::with_name("repair")
                .about("Rebuild a structure's metadata from its items")
                .arg(key_arg()),
        )
}

fn main() -> CliResult<()> {
    let logger = engine::get_default_logger();
    let matches = app().get_matches();

    let mut config = match matches.value_of("config") {
        Some(file) => TowerConfig::from_file(&PathBuf::from(file))?,
        None => TowerConfig::default(),
    };
    // --path wins over the file; without either, use the current directory.
    if let Some(dir) = matches.value_of("path") {
        config.storage.path = PathBuf::from(dir).join("tower.db");
    } else if matches.value_of("config").is_none() {
        config.storage.path = current_dir()?.join("tower.db");
    }
    let interval = config.expiry.sweep_interval_ms;

    let tower = Arc::new(Tower::open_with_logger(config, &logger)?);
    let outcome = match matches.subcommand() {
        ("sweep", Some(sub)) if sub.is_present("watch") => {
            watch(tower.clone(), std::time::Duration::from_millis(interval))
        }
        (name, Some(sub)) => run(&tower, name, sub),
        _ => unreachable!(),
    };

    if let Err(err) = outcome {
        println!("{}", err);
        drop(tower);
        exit(1);
    }
    Ok(())
}

fn watch(tower: Arc<Tower>, interval: std::time::Duration) -> CliResult<()> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))?;

    info!(tower.logger(), "Sweeping until interrupted";
          "interval_ms" => interval.as_millis() as u64);
    let sweeper = Sweeper::spawn(tower, interval)?;
    while running.load(Ordering::SeqCst) {
        std::thread::sleep(std::time::Duration::from_millis(100));
    }
    sweeper.stop();
    Ok(())
}

fn arg<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches.value_of(name).unwrap_or_default()
}

fn parse_value(text: &str, ty: &str) -> CliResult<Value> {
    Ok(match ty {
        "int" => Value::Int(text.parse()?),
        "float" => Value::Float(text.parse()?),
        "decimal" => Value::Decimal(text.parse::<Decimal>()?),
        "bool" => Value::Bool(text.parse()?),
        _ => Value::from(text),
    })
}

fn parse_time(text: &str) -> CliResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(text)?.with_timezone(&Utc))
}

/// Treats an already existing structure as success.
fn ensure(created: tower::Result<()>) -> tower::Result<()> {
    match created {
        Ok(()) | Err(Error::AlreadyExists) => Ok(()),
        Err(err) => Err(err),
    }
}

fn run(tower: &Tower, name: &str, matches: &ArgMatches) -> CliResult<()> {
    let key = arg(matches, "KEY");
    let ty = arg(matches, "type");
    match name {
        "get" => println!("{}", tower.get(key)?),
        "set" => tower.set(key, parse_value(arg(matches, "VALUE"), ty)?)?,
        "del" => tower.delete(key)?,
        "exists" => println!("{}", tower.exists(key)?),
        "incr" => println!("{}", tower.incr_by(key, arg(matches, "BY").parse()?)?),
        "lpush" | "rpush" => {
            let lists = tower.lists();
            ensure(lists.create(key))?;
            let mut len = 0;
            for text in matches.values_of("VALUE").into_iter().flatten() {
                let value = parse_value(text, ty)?;
                len = if name == "lpush" {
                    lists.push_left(key, value)?
                } else {
                    lists.push_right(key, value)?
                };
            }
            println!("{}", len);
        }
        "lpop" => println!("{}", tower.lists().pop_left(key)?),
        "rpop" => println!("{}", tower.lists().pop_right(key)?),
        "lrange" => {
            let start = arg(matches, "START").parse()?;
            let end = arg(matches, "END").parse()?;
            for value in tower.lists().range(key, start, end)? {
                println!("{}", value);
            }
        }
        "llen" => println!("{}", tower.lists().len(key)?),
        "hset" => {
            let maps = tower.maps();
            ensure(maps.create(key))?;
            let value = parse_value(arg(matches, "VALUE"), ty)?;
            println!("{}", maps.set(key, arg(matches, "FIELD"), value)?);
        }
        "hget" => println!("{}", tower.maps().get(key, arg(matches, "FIELD"))?),
        "hdel" => println!("{}", tower.maps().remove(key, arg(matches, "FIELD"))?),
        "hkeys" => {
            for field in tower.maps().keys(key)? {
                println!("{}", field);
            }
        }
        "sadd" => {
            let sets = tower.sets();
            ensure(sets.create(key))?;
            let mut count = 0;
            for member in matches.values_of("MEMBER").into_iter().flatten() {
                count = sets.add(key, member)?;
            }
            println!("{}", count);
        }
        "srem" => println!("{}", tower.sets().remove(key, arg(matches, "MEMBER"))?),
        "sismember" => println!("{}", tower.sets().is_member(key, arg(matches, "MEMBER"))?),
        "scard" => println!("{}", tower.sets().cardinality(key)?),
        "bfadd" => {
            let blooms = tower.blooms();
            let slots = match matches.value_of("slots") {
                Some(slots) => Some(slots.parse()?),
                None => None,
            };
            ensure(blooms.create(key, slots))?;
            println!("{}", blooms.add(key, arg(matches, "ITEM"))?);
        }
        "bfexists" => println!("{}", tower.blooms().contains(key, arg(matches, "ITEM"))?),
        "tsadd" => {
            let series = tower.series();
            ensure(series.create(key))?;
            let at = parse_time(arg(matches, "TIME"))?;
            let value = parse_value(arg(matches, "VALUE"), ty)?;
            println!("{}", series.add(key, at, value)?);
        }
        "tsrange" => {
            let from = parse_time(arg(matches, "FROM"))?;
            let to = parse_time(arg(matches, "TO"))?;
            for (at, value) in tower.series().range(key, from, to)? {
                println!("{}\t{}", at.to_rfc3339(), value);
            }
        }
        "expire" => {
            let seconds: i64 = arg(matches, "SECONDS").parse()?;
            if seconds.checked_abs().map_or(true, |s| s > i64::MAX / 1000) {
                return Err(failure::err_msg(format!("SECONDS out of range: {}", seconds)));
            }
            println!("{}", tower.expire_in(key, Duration::seconds(seconds))?);
        }
        "persist" => tower.remove_ttl(key)?,
        "ttl" => match tower.expire_at(key)? {
            Some(at) => println!("{}", at.to_rfc3339()),
            None => println!("none"),
        },
        "sweep" => {
            let report = tower.sweep_now()?;
            println!("deleted {}", report.deleted);
        }
        "repair" => {
            let report = tower.repair(key)?;
            println!("{} {} -> {}", report.kind, report.before, report.after);
        }
        _ => unreachable!(),
    }
    Ok(())
}
