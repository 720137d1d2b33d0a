use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Keys and signing secrets are deliberately left off this list
    const DISPLAY_ENVS: [&str; 18] = [
        "RUST_LOG",
        "TLG_HOST",
        "TLG_PORT",
        "TLG_RECORD_STORE",
        "TLG_DATABASE_URL",
        "TLG_CACHE_TTL_SECS",
        "TLG_REMOTE_TIMEOUT_SECS",
        "TLG_FEE_RATE_BPS",
        "TLG_PRICES_FROM_CONSTANTS",
        "TLG_CURRENCY",
        "TLG_AIRTABLE_API_URL",
        "TLG_AIRTABLE_BASE_ID",
        "TLG_AIRTABLE_ORDERS_TABLE",
        "TLG_AIRTABLE_AGGREGATIONS_TABLE",
        "TLG_AIRTABLE_CONSTANTS_TABLE",
        "TLG_AIRTABLE_PURCHASERS_TABLE",
        "TLG_STRIPE_API_URL",
        "TLG_STRIPE_WEBHOOK_TOLERANCE_SECS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
