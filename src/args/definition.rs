//! Command-line argument definition and processing.

use std::time::Duration;

use clap::{ArgGroup, Parser};

use crate::args::{downloads, org, search};
use crate::settings::Settings;
use crate::sources::{CachedClient, HttpClient};

/// npmscout - Search the npm registry, list organization packages, and look up downloads
#[derive(Parser, Debug)]
#[command(name = "npmscout")]
#[command(version)]
#[command(about = "Search the npm registry, list organization packages, and look up downloads", long_about = None)]
#[command(group(ArgGroup::new("mode").required(true).args(["search", "org", "downloads"])))]
pub struct Args {
    /// Set the logging level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Enable verbose output (equivalent to --log-level debug)
    #[arg(short, long)]
    pub verbose: bool,

    /// Search packages by free text
    #[arg(short, long)]
    pub search: Option<String>,

    /// Records per search page (overrides page_size from settings.conf)
    #[arg(long)]
    pub size: Option<usize>,

    /// Keep loading search results until this many are held (use with --search)
    #[arg(long, requires = "search")]
    pub more: Option<usize>,

    /// List all published packages of an organization (e.g., npmscout --org babel)
    #[arg(short, long)]
    pub org: Option<String>,

    /// Look up weekly downloads for packages (space-separated)
    #[arg(short, long, num_args = 1..)]
    pub downloads: Vec<String>,

    /// Print results as pretty JSON
    #[arg(long)]
    pub json: bool,

    /// Registry base URL (overrides registry_url from settings.conf)
    #[arg(long)]
    pub registry_url: Option<String>,

    /// Downloads API base URL (overrides downloads_url from settings.conf)
    #[arg(long)]
    pub downloads_url: Option<String>,
}

impl Args {
    /// Settings with this invocation's overrides applied.
    #[must_use]
    pub fn apply_to(&self, settings: Settings) -> Settings {
        settings.with_overrides(
            self.registry_url.as_deref(),
            self.downloads_url.as_deref(),
            self.size,
        )
    }
}

/// What: Run the mode selected on the command line.
///
/// Inputs:
/// - `args`: Parsed command-line arguments
/// - `settings`: Effective settings (overrides already applied)
///
/// Output:
/// - Process exit code: 0 on success, 1 on failure.
///
/// Details:
/// - Every mode shares one cached HTTP transport.
/// - Results go to stdout, notices and errors to stderr.
pub async fn process_args(args: &Args, settings: &Settings) -> i32 {
    let http = match HttpClient::new(settings) {
        Ok(http) => http,
        Err(e) => {
            eprintln!("npmscout: cannot create HTTP client: {e}");
            tracing::error!(error = %e, "failed to build HTTP client");
            return 1;
        }
    };
    let client = CachedClient::new(
        http,
        settings.cache_capacity,
        Duration::from_secs(settings.cache_ttl_secs),
    );
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();

    if let Some(query) = &args.search {
        let request = search::SearchRequest {
            query,
            size: settings.page_size,
            more: args.more,
            json: args.json,
        };
        search::handle_search(client, &request, &mut stdout, &mut stderr).await
    } else if let Some(name) = &args.org {
        org::handle_org(
            &client,
            name,
            settings.metadata_concurrency,
            args.json,
            &mut stdout,
            &mut stderr,
        )
        .await
    } else {
        downloads::handle_downloads(&client, &args.downloads, args.json, &mut stdout, &mut stderr)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// What: Exactly one mode is required and `--more` needs `--search`.
    fn mode_group_is_enforced() {
        assert!(Args::try_parse_from(["npmscout"]).is_err());
        assert!(Args::try_parse_from(["npmscout", "--org", "babel", "--search", "x"]).is_err());
        assert!(Args::try_parse_from(["npmscout", "--org", "babel", "--more", "5"]).is_err());
        let args = Args::try_parse_from(["npmscout", "-s", "react", "--more", "60", "--json"])
            .expect("search args");
        assert_eq!(args.search.as_deref(), Some("react"));
        assert_eq!(args.more, Some(60));
        assert!(args.json);
    }

    #[test]
    fn downloads_accepts_several_names() {
        let args = Args::try_parse_from(["npmscout", "--downloads", "react", "@types/node"])
            .expect("downloads args");
        assert_eq!(args.downloads, vec!["react", "@types/node"]);
    }

    #[test]
    /// What: Command-line URLs and size override settings.
    fn overrides_apply_to_settings() {
        let args = Args::try_parse_from([
            "npmscout",
            "--search",
            "x",
            "--size",
            "5",
            "--registry-url",
            "http://127.0.0.1:4873/",
        ])
        .expect("args");
        let settings = args.apply_to(Settings::default());
        assert_eq!(settings.page_size, 5);
        assert_eq!(settings.registry_url, "http://127.0.0.1:4873");
        assert_eq!(settings.downloads_url, "https://api.npmjs.org");
    }
}
