use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("linkmerge")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("linkmerge")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner, spinners and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Initializes the linkmerge config and page database on your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location to store the linkmerge config and database")
                        .default_value("~/.config/linkmerge/"),
                )
                .arg(
                    arg!(-f - -"force")
                        .help(
                            "Forces the overwriting of any existing config and database at the \
                        specified location.",
                        )
                        .required(false),
                ),
        )
        .subcommand(
            command!("merge")
                .about(
                    "Merge a batch of parsed out-links into the page database. Updates inlinks, \
                distance and scores of every linked page.",
                )
                .arg(
                    arg!(-i --"input" <PATH>)
                        .required(true)
                        .help("Path to a JSON-lines file of outlink records")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-d --"db" <PATH>)
                        .required(false)
                        .help("Config directory holding linkmerge.db and linkmerge.json")
                        .default_value("~/.config/linkmerge/"),
                )
                .arg(
                    arg!(-t --"workers" <NUM_WORKERS>)
                        .required(false)
                        .help("The number of merge workers (default: from config)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(-s --"scoring" <FILTERS>)
                        .required(false)
                        .help("Comma separated scoring filter chain, e.g. opic,depth"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, markdown")
                        .value_parser(["text", "json", "markdown"])
                        .default_value("text"),
                )
                .arg(
                    arg!(--"pages" <NUM_PAGES>)
                        .required(false)
                        .help("Number of stored pages to list in the report")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("50"),
                ),
        )
        .subcommand(
            command!("show")
                .about("Show the stored state of one page")
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The URL of the page")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(-d --"db" <PATH>)
                        .required(false)
                        .help("Config directory holding linkmerge.db")
                        .default_value("~/.config/linkmerge/"),
                )
                .arg(
                    arg!(--"json")
                        .required(false)
                        .help("Print the page as JSON")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("reverse")
                .about("Print the reversed key of a URL")
                .arg(arg!(<URL>).required(true).help("The URL to reverse")),
        )
        .subcommand(
            command!("unreverse")
                .about("Print the URL of a reversed key")
                .arg(arg!(<KEY>).required(true).help("The reversed key")),
        )
}
