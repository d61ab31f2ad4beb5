use anyhow::{anyhow, Context, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use spacetraveling::api::RawDocument;
use spacetraveling::build::build_site;
use spacetraveling::config::Config;
use spacetraveling::{normalize, reading_time};
use std::fs::File;
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let matches = App::new("spacetraveling")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Builds the blog from posts in a headless CMS")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("build")
                .about("Builds the static site")
                .arg(
                    Arg::with_name("project")
                        .long("project")
                        .short("p")
                        .takes_value(true)
                        .help("The project directory (defaults to the current directory)"),
                )
                .arg(
                    Arg::with_name("output")
                        .long("output")
                        .short("o")
                        .takes_value(true)
                        .help(
                            "The output directory (defaults to `_output` in the project directory)",
                        ),
                )
                .arg(
                    Arg::with_name("access-token")
                        .long("access-token")
                        .takes_value(true)
                        .help("Overrides the content API access token"),
                ),
        )
        .subcommand(
            SubCommand::with_name("reading-time")
                .about("Prints the reading time of a post document saved as JSON")
                .arg(Arg::with_name("FILE").required(true).index(1))
                .arg(
                    Arg::with_name("words-per-minute")
                        .long("words-per-minute")
                        .takes_value(true)
                        .help("The reading speed (defaults to 200)"),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        ("build", Some(matches)) => build(matches).await,
        ("reading-time", Some(matches)) => print_reading_time(matches),
        _ => Ok(()),
    }
}

async fn build(matches: &ArgMatches<'_>) -> Result<()> {
    let project = match matches.value_of("project") {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };
    let output = match matches.value_of("output") {
        Some(dir) => PathBuf::from(dir),
        None => project.join("_output"),
    };
    let config = Config::from_directory(
        &project,
        &output,
        matches.value_of("access-token").map(str::to_owned),
    )?;
    let api = config.client.build()?;
    build_site(&config, &api).await?;
    Ok(())
}

fn print_reading_time(matches: &ArgMatches<'_>) -> Result<()> {
    let words_per_minute = words_per_minute(matches.value_of("words-per-minute"))?;
    // `FILE` is required, so clap guarantees a value.
    let path = Path::new(matches.value_of("FILE").unwrap_or_default());
    let file = File::open(path)
        .with_context(|| format!("Opening post file `{}`", path.display()))?;
    let raw: RawDocument = serde_json::from_reader(file)
        .with_context(|| format!("Parsing post file `{}`", path.display()))?;
    let post = normalize::post(raw);
    println!(
        "{} min",
        reading_time::estimate(post.sections(), words_per_minute)
    );
    Ok(())
}

fn words_per_minute(arg: Option<&str>) -> Result<u32> {
    let words_per_minute = match arg {
        Some(wpm) => wpm.parse().context("Parsing --words-per-minute")?,
        None => reading_time::WORDS_PER_MINUTE,
    };
    if words_per_minute == 0 {
        return Err(anyhow!("--words-per-minute must be at least 1"));
    }
    Ok(words_per_minute)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_words_per_minute() -> Result<()> {
        assert_eq!(reading_time::WORDS_PER_MINUTE, words_per_minute(None)?);
        assert_eq!(150, words_per_minute(Some("150"))?);
        assert!(words_per_minute(Some("0")).is_err());
        assert!(words_per_minute(Some("fast")).is_err());
        Ok(())
    }
}
