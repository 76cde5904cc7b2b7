// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn json_args() -> [Arg; 2] {
    [
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print pretty JSON"),
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    ]
}

fn id_arg(name: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .required(true)
        .value_parser(value_parser!(i64))
}

fn filter_args() -> Vec<Arg> {
    vec![
        Arg::new("counterparty").long("counterparty").short('c'),
        Arg::new("direction")
            .long("direction")
            .help("gave | received"),
        Arg::new("kind")
            .long("kind")
            .help("loan | bill_payment | recharge | other"),
        Arg::new("status")
            .long("status")
            .help("pending | partially_settled | settled | cancelled"),
        Arg::new("month").long("month").help("YYYY-MM"),
        Arg::new("include_cancelled")
            .long("include-cancelled")
            .action(ArgAction::SetTrue),
        Arg::new("limit")
            .long("limit")
            .value_parser(value_parser!(usize)),
    ]
}

pub fn build_cli() -> Command {
    Command::new("duebook")
        .about("Track money lent and borrowed, partial settlements, tasks and reminders")
        .version(clap::crate_version!())
        .arg(
            Arg::new("db")
                .long("db")
                .global(true)
                .env("DUEBOOK_DB")
                .help("Path to the SQLite database (defaults to the platform data dir)"),
        )
        .subcommand(Command::new("init").about("Create the database if missing"))
        .subcommand(
            Command::new("cp")
                .about("Counterparties")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("phone").long("phone"))
                        .arg(Arg::new("note").long("note")),
                )
                .subcommand(Command::new("list").args(json_args()))
                .subcommand(
                    Command::new("balance")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(
                            Arg::new("json")
                                .long("json")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(
                    Command::new("rename")
                        .arg(Arg::new("from").long("from").required(true))
                        .arg(Arg::new("to").long("to").required(true)),
                )
                .subcommand(Command::new("rm").arg(Arg::new("name").long("name").required(true))),
        )
        .subcommand(
            Command::new("tx")
                .about("Lend/borrow transactions")
                .subcommand(
                    Command::new("add")
                        .arg(
                            Arg::new("counterparty")
                                .long("counterparty")
                                .short('c')
                                .required(true),
                        )
                        .arg(
                            Arg::new("direction")
                                .long("direction")
                                .required(true)
                                .help("gave (they owe you) | received (you owe them)"),
                        )
                        .arg(
                            Arg::new("kind")
                                .long("kind")
                                .help("loan | bill_payment | recharge | other (default loan)"),
                        )
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("date").long("date").help("YYYY-MM-DD, default today"))
                        .arg(Arg::new("note").long("note")),
                )
                .subcommand(Command::new("list").args(filter_args()).args(json_args()))
                .subcommand(
                    Command::new("show").arg(id_arg("id")).arg(
                        Arg::new("json")
                            .long("json")
                            .action(ArgAction::SetTrue),
                    ),
                )
                .subcommand(Command::new("cancel").arg(id_arg("id")))
                .subcommand(Command::new("rm").arg(id_arg("id")))
                .subcommand(Command::new("restore").arg(id_arg("id"))),
        )
        .subcommand(
            Command::new("pay")
                .about("Partial payments against a transaction")
                .subcommand(
                    Command::new("add")
                        .arg(id_arg("tx"))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("date").long("date"))
                        .arg(Arg::new("note").long("note"))
                        .arg(
                            Arg::new("allow_surplus")
                                .long("allow-surplus")
                                .action(ArgAction::SetTrue)
                                .help("Record an overpayment instead of refusing it"),
                        ),
                )
                .subcommand(Command::new("list").arg(id_arg("tx")).args(json_args()))
                .subcommand(Command::new("rm").arg(id_arg("id"))),
        )
        .subcommand(
            Command::new("report")
                .about("Aggregates over non-cancelled transactions")
                .subcommand(Command::new("summary").args(json_args()))
                .subcommand(
                    Command::new("monthly")
                        .arg(Arg::new("month").long("month").help("YYYY-MM"))
                        .arg(
                            Arg::new("months")
                                .long("months")
                                .value_parser(value_parser!(usize))
                                .default_value("12"),
                        )
                        .args(json_args()),
                )
                .subcommand(Command::new("by-counterparty").args(json_args())),
        )
        .subcommand(
            Command::new("task")
                .about("To-do items")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("title").long("title").required(true))
                        .arg(Arg::new("note").long("note"))
                        .arg(Arg::new("due").long("due").help("YYYY-MM-DD")),
                )
                .subcommand(
                    Command::new("list")
                        .arg(Arg::new("status").long("status"))
                        .args(json_args()),
                )
                .subcommand(Command::new("done").arg(id_arg("id")))
                .subcommand(Command::new("cancel").arg(id_arg("id")))
                .subcommand(Command::new("reopen").arg(id_arg("id"))),
        )
        .subcommand(
            Command::new("reminder")
                .about("Time-based reminders")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("title").long("title").required(true))
                        .arg(Arg::new("note").long("note"))
                        .arg(
                            Arg::new("at")
                                .long("at")
                                .required(true)
                                .help("YYYY-MM-DD HH:MM"),
                        )
                        .arg(
                            Arg::new("tx")
                                .long("tx")
                                .value_parser(value_parser!(i64)),
                        ),
                )
                .subcommand(
                    Command::new("list")
                        .arg(Arg::new("status").long("status"))
                        .args(json_args()),
                )
                .subcommand(Command::new("due").args(json_args()))
                .subcommand(Command::new("done").arg(id_arg("id")))
                .subcommand(
                    Command::new("snooze").arg(id_arg("id")).arg(
                        Arg::new("minutes")
                            .long("minutes")
                            .value_parser(value_parser!(i64))
                            .default_value("60"),
                    ),
                ),
        )
        .subcommand(
            Command::new("audit")
                .about("Show the audit trail")
                .arg(Arg::new("entity").long("entity"))
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(value_parser!(usize))
                        .default_value("50"),
                )
                .args(json_args()),
        )
        .subcommand(
            Command::new("backup")
                .about("Whole-database JSON backup and restore")
                .subcommand(
                    Command::new("export").arg(Arg::new("out").long("out").required(true)),
                )
                .subcommand(
                    Command::new("import").arg(Arg::new("path").long("path").required(true)),
                ),
        )
        .subcommand(
            Command::new("export").subcommand(
                Command::new("transactions")
                    .arg(
                        Arg::new("format")
                            .long("format")
                            .default_value("csv")
                            .help("csv | json"),
                    )
                    .arg(Arg::new("out").long("out").required(true))
                    .args(filter_args()),
            ),
        )
        .subcommand(
            Command::new("config")
                .about("Settings")
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("key").required(true))
                        .arg(Arg::new("value").required(true)),
                )
                .subcommand(Command::new("get").arg(Arg::new("key").required(true)))
                .subcommand(Command::new("list")),
        )
        .subcommand(
            Command::new("doctor").arg(
                Arg::new("fix")
                    .long("fix")
                    .action(ArgAction::SetTrue)
                    .help("Recompute stale remaining dues"),
            ),
        )
}
