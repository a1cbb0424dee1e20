#![forbid(unsafe_code)]
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};
use ward_roster::{
    io,
    model::{MemberId, Request, RequestId, ShiftKind, WardId},
    rule::Rule,
    scheduler::{RunParams, Scheduler},
    store::{JsonStore, WardBook},
    EngineConfig, RunKey,
};

/// CLI de planning mensuel d'un service (sans base de données)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Fichier JSON du service
    #[arg(long, global = true, default_value = "ward.json")]
    book: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Créer un livre de service vide
    Init {
        #[arg(long)]
        ward: String,
    },

    /// Importer des membres depuis un CSV
    ImportMembers {
        #[arg(long)]
        csv: String,
    },

    /// Importer des demandes depuis un CSV
    ImportRequests {
        #[arg(long)]
        csv: String,
    },

    /// Remplacer la règle du service (fichier JSON)
    SetRule {
        #[arg(long)]
        json: String,
    },

    /// Déposer une demande de poste
    Request {
        #[arg(long)]
        member: String,
        /// YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// D, E, N, O, M ou nom complet
        #[arg(long)]
        shift: String,
        #[arg(long, default_value = "")]
        memo: String,
    },

    /// Générer le planning d'un mois
    Generate {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        /// Remplace un planning existant
        #[arg(long)]
        force: bool,
        /// liste "id1,id2,..." des demandes à satisfaire en priorité
        #[arg(long)]
        requests: Option<String>,
        /// Fichier JSON de configuration du moteur
        #[arg(long)]
        config: Option<String>,
        #[arg(long)]
        max_sweeps: Option<usize>,
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Export CSV des demandes non satisfaites (optionnel)
        #[arg(long)]
        report: Option<String>,
    },

    /// Afficher et optionnellement exporter un planning
    Show {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        #[arg(long)]
        out_csv: Option<String>,
    },

    /// Vérifier un planning enregistré
    Check {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let store = JsonStore::open(&cli.book)?;
    if let Commands::Init { ward } = &cli.cmd {
        if store.exists() {
            bail!("{} existe déjà", cli.book);
        }
        store.save(&WardBook::new(WardId::new(ward)))?;
        println!("ward {ward} initialised in {}", cli.book);
        std::process::exit(0);
    }
    let mut book = store.load()?;

    let code = match cli.cmd {
        Commands::Init { .. } => 0,
        Commands::ImportMembers { csv } => {
            let members = io::import_members_csv(csv)?;
            for member in members {
                if book.members.iter().any(|m| m.id == member.id) {
                    bail!("duplicate member id: {}", member.id);
                }
                book.members.push(member);
            }
            store.save(&book)?;
            0
        }
        Commands::ImportRequests { csv } => {
            let requests = io::import_requests_csv(csv)?;
            book.requests.extend(requests);
            store.save(&book)?;
            0
        }
        Commands::SetRule { json } => {
            let data = std::fs::read(&json).with_context(|| format!("reading {json}"))?;
            let rule: Rule = serde_json::from_slice(&data).context("parsing rule")?;
            rule.validate()?;
            book.rule = Some(rule);
            store.save(&book)?;
            0
        }
        Commands::Request {
            member,
            date,
            shift,
            memo,
        } => {
            let member = MemberId::new(member);
            if !book.members.iter().any(|m| m.id == member) {
                bail!("unknown member: {member}");
            }
            let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .with_context(|| format!("invalid date: {date}"))?;
            let shift: ShiftKind = shift.parse()?;
            let request = Request::new(member, date, shift).with_memo(memo);
            println!("{}", request.id);
            book.requests.push(request);
            store.save(&book)?;
            0
        }
        Commands::Generate {
            year,
            month,
            force,
            requests,
            config,
            max_sweeps,
            timeout_ms,
            report,
        } => {
            let mut engine_config = match config {
                Some(path) => EngineConfig::from_path(path)?,
                None => EngineConfig::default(),
            };
            if max_sweeps.is_some() {
                engine_config.max_sweeps = max_sweeps;
            }
            if timeout_ms.is_some() {
                engine_config.repair_timeout_ms = timeout_ms;
            }

            let mut params = RunParams::new(year, month).force(force);
            if let Some(list) = requests {
                let ids: Vec<RequestId> = list
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(RequestId::new)
                    .collect();
                params = params.only_requests(ids);
            }

            let scheduler = Scheduler::new(engine_config);
            let result = scheduler.generate(&store, &book.snapshot(), &params)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if let Some(path) = report {
                io::export_unreflected_csv(path, &result.unreflected_requests)?;
            }
            // Code 2 = conflit ou couverture incomplète
            if result.success {
                0
            } else {
                2
            }
        }
        Commands::Show {
            year,
            month,
            out_csv,
        } => {
            let key = RunKey::new(book.ward.clone(), year, month);
            let grid = book
                .grid(&key)
                .with_context(|| format!("no schedule for {key}"))?;
            if let Some(path) = out_csv {
                io::export_grid_csv(path, grid)?;
            }
            for row in &grid.rows {
                let name = book
                    .members
                    .iter()
                    .find(|m| m.id == row.member)
                    .map(|m| m.name.as_str())
                    .unwrap_or("-");
                let line: String = row.shifts.iter().map(|k| k.code()).collect();
                println!("{:<12} {:<20} | {}", row.member.as_str(), name, line);
            }
            0
        }
        Commands::Check { year, month } => {
            let key = RunKey::new(book.ward.clone(), year, month);
            let grid = book
                .grid(&key)
                .with_context(|| format!("no schedule for {key}"))?;
            let rule = book.rule.as_ref().context("ward has no rule")?;
            let evaluation = Scheduler::default().evaluate(grid, &book.members, rule)?;
            for (name, penalty) in &evaluation.breakdown {
                println!("{name}: {penalty}");
            }
            println!("soft penalty: {}", evaluation.soft_penalty);
            for b in &evaluation.mandatory_breaches {
                eprintln!("mandatory rule {} broken by {} ({} unit(s))", b.rule, b.member_id, b.units);
            }
            if evaluation.hard_feasible && evaluation.mandatory_breaches.is_empty() {
                println!("OK: hard constraints satisfied");
                0
            } else {
                eprintln!(
                    "Found {} hard violation(s)",
                    evaluation.hard_violations.len()
                );
                for v in &evaluation.hard_violations {
                    eprintln!("{v:?}");
                }
                2
            }
        }
    };

    std::process::exit(code);
}
