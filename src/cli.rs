// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, crate_version};

fn month_arg() -> Arg {
    Arg::new("month")
        .long("month")
        .required(true)
        .help("Month as YYYY-MM")
}

fn json_args() -> [Arg; 2] {
    [
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print JSON"),
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    ]
}

fn amount_arg(help: &'static str) -> Arg {
    Arg::new("amount")
        .long("amount")
        .required(true)
        .allow_hyphen_values(true)
        .help(help)
}

fn date_arg() -> Arg {
    Arg::new("date")
        .long("date")
        .required(true)
        .help("Date as YYYY-MM-DD")
}

pub fn build_cli() -> Command {
    Command::new("envelope")
        .version(crate_version!())
        .about("Envelope ledger: month-chained account and category balances")
        .arg(
            Arg::new("today")
                .long("today")
                .global(true)
                .help("Treat this date (YYYY-MM-DD) as today"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging (RUST_LOG takes precedence)"),
        )
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(
            Command::new("config")
                .about("Engine settings")
                .subcommand(Command::new("show"))
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("key").long("key").required(true))
                        .arg(
                            Arg::new("value")
                                .long("value")
                                .required(true)
                                .value_parser(clap::value_parser!(u32)),
                        ),
                ),
        )
        .subcommand(
            Command::new("budget")
                .about("Manage budgets")
                .subcommand(
                    Command::new("add").arg(Arg::new("name").long("name").required(true)),
                )
                .subcommand(Command::new("list"))
                .subcommand(
                    Command::new("use").arg(Arg::new("name").long("name").required(true)),
                )
                .subcommand(
                    Command::new("months-back")
                        .about("Months back used by percentage-of-income allocations")
                        .arg(
                            Arg::new("months")
                                .long("months")
                                .required(true)
                                .value_parser(clap::value_parser!(u32)),
                        ),
                ),
        )
        .subcommand(
            Command::new("account")
                .about("Manage accounts")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("type").long("type").default_value("checking"))
                        .arg(Arg::new("group").long("group"))
                        .arg(
                            Arg::new("off-budget")
                                .long("off-budget")
                                .action(ArgAction::SetTrue),
                        )
                        .arg(
                            Arg::new("opening")
                                .long("opening")
                                .allow_hyphen_values(true)
                                .default_value("0"),
                        ),
                )
                .subcommand(Command::new("list").args(json_args()))
                .subcommand(
                    Command::new("close").arg(Arg::new("name").long("name").required(true)),
                ),
        )
        .subcommand(
            Command::new("category")
                .about("Manage categories")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("group").long("group"))
                        .arg(Arg::new("default").long("default").default_value("0"))
                        .arg(
                            Arg::new("rule")
                                .long("rule")
                                .value_parser(["fixed", "percentage"])
                                .default_value("fixed"),
                        )
                        .arg(
                            Arg::new("opening")
                                .long("opening")
                                .allow_hyphen_values(true)
                                .default_value("0"),
                        ),
                )
                .subcommand(Command::new("list").args(json_args())),
        )
        .subcommand(
            Command::new("tx")
                .about("Record transactions")
                .subcommand(
                    Command::new("income")
                        .arg(date_arg())
                        .arg(Arg::new("account").long("account").required(true))
                        .arg(amount_arg("Amount received (positive)"))
                        .arg(Arg::new("payee").long("payee"))
                        .arg(Arg::new("note").long("note")),
                )
                .subcommand(
                    Command::new("expense")
                        .arg(date_arg())
                        .arg(Arg::new("account").long("account").required(true))
                        .arg(Arg::new("category").long("category").required(true))
                        .arg(amount_arg("Signed amount: negative spends, positive refunds"))
                        .arg(Arg::new("payee").long("payee"))
                        .arg(Arg::new("note").long("note")),
                )
                .subcommand(
                    Command::new("transfer")
                        .arg(date_arg())
                        .arg(amount_arg("Amount moved (positive)"))
                        .arg(Arg::new("from-account").long("from-account"))
                        .arg(Arg::new("to-account").long("to-account"))
                        .arg(Arg::new("from-category").long("from-category"))
                        .arg(Arg::new("to-category").long("to-category"))
                        .arg(Arg::new("note").long("note")),
                )
                .subcommand(
                    Command::new("adjust")
                        .arg(date_arg())
                        .arg(amount_arg("Signed correction"))
                        .arg(Arg::new("account").long("account"))
                        .arg(Arg::new("category").long("category"))
                        .arg(Arg::new("payee").long("payee"))
                        .arg(Arg::new("note").long("note")),
                )
                .subcommand(Command::new("list").arg(month_arg()).args(json_args()))
                .subcommand(
                    Command::new("rm").arg(
                        Arg::new("id")
                            .long("id")
                            .required(true)
                            .value_parser(clap::value_parser!(i64)),
                    ),
                ),
        )
        .subcommand(
            Command::new("alloc")
                .about("Draft and finalized allocations")
                .subcommand(Command::new("show").arg(month_arg()).args(json_args()))
                .subcommand(
                    Command::new("finalize").arg(month_arg()).arg(
                        Arg::new("set")
                            .long("set")
                            .action(ArgAction::Append)
                            .help("Override one category as CATEGORY=AMOUNT"),
                    ),
                ),
        )
        .subcommand(
            Command::new("recalc").about("Recalculate balances").arg(
                Arg::new("all")
                    .long("all")
                    .action(ArgAction::SetTrue)
                    .help("Ignore stored anchors and rebuild from the oldest month"),
            ),
        )
        .subcommand(
            Command::new("status")
                .about("Month balances for accounts and categories")
                .arg(month_arg())
                .args(json_args()),
        )
        .subcommand(Command::new("ready").about("Ready to assign").args(json_args()))
        .subcommand(Command::new("doctor").about("Report precision drift and missing anchors"))
}
