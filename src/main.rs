use clap::{CommandFactory, Parser};
use popdata_processor::cli::{Args, commands};
use std::process;

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    match commands::run(args) {
        Ok(()) => process::exit(0),
        Err(error) => {
            // Error occurred - print to stderr and exit with error code
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

/// Show help information and typical workflows when no subcommand is provided
fn show_help_and_commands() {
    println!("popdata - Statistical Export Cleaner");
    println!("====================================");
    println!();
    println!("Turn fixed-format statistics bureau text exports into clean CSV,");
    println!("then summarise the result or hand operations to a local model.");
    println!();
    let _ = Args::command().print_help();
    println!();
    println!("EXAMPLES:");
    println!("    # Clean a population export (writes 年末常住人口_cleaned.csv):");
    println!("    popdata extract assets/年末常住人口.txt");
    println!();
    println!("    # Keep the region header row and copy lines verbatim:");
    println!("    popdata extract assets/年末常住人口.txt --policy region");
    println!();
    println!("    # Append mean/max/min columns:");
    println!("    popdata stats assets/年末常住人口_cleaned.csv");
    println!();
    println!("    # Ten-year trend for one province:");
    println!("    popdata trend assets/年末常住人口_cleaned.csv 浙江省");
    println!();
    println!("    # Run the operations selected in a saved model response:");
    println!("    popdata dispatch --response response.json --assets-dir assets");
}
