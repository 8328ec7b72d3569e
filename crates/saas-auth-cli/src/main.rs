// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `saas-auth`: operator tooling for the role-based ability engine.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use saas_auth::{
	Ability, Action, Actor, Authorizer, Decision, PolicySettings, SubjectType, TaggedInstance, UserId,
};
use saas_auth_config::{AuthConfig, LoggingConfig};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Inspect and check authorization policies.
#[derive(Parser, Debug)]
#[command(name = "saas-auth", about = "Inspect and check authorization policies", version)]
struct Args {
	/// Path to the TOML configuration file
	#[arg(long, global = true, env = "SAAS_AUTH_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Decide whether a role may perform an action on a subject
	Check {
		/// Membership role (ADMIN, MEMBER, BILLING)
		#[arg(long)]
		role: String,
		/// Acting user id
		#[arg(long)]
		user: Uuid,
		/// Action name (manage, get, create, update, delete, transfer_ownership, export)
		#[arg(long)]
		action: String,
		/// Bare subject type, e.g. Project or all
		#[arg(long, conflicts_with = "instance", required_unless_present = "instance")]
		subject: Option<String>,
		/// Tagged instance as JSON, e.g. '{"__typeName":"Project","ownerId":"..."}'
		#[arg(long)]
		instance: Option<String>,
		/// Output as JSON
		#[arg(long)]
		json: bool,
	},
	/// Print a role's rule list as JSON
	Rules {
		#[arg(long)]
		role: String,
		#[arg(long)]
		user: Uuid,
	},
	/// Build every role's ability and report rule counts
	Validate,
}

fn main() -> ExitCode {
	let args = Args::parse();

	match run(args) {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:#}");
			ExitCode::from(2)
		}
	}
}

fn run(args: Args) -> Result<ExitCode> {
	let config = load_config(args.config.as_deref())?;
	init_tracing(&config.logging);
	// loading ran before the subscriber existed
	config.log_summary();

	let authorizer = Authorizer::standard(PolicySettings {
		audit_decisions: config.policy.audit_decisions,
	});

	match args.command {
		Command::Check {
			role,
			user,
			action,
			subject,
			instance,
			json,
		} => {
			let ability = ability_for(&authorizer, user, &role)?;
			let action: Action = action.parse()?;
			let decision = match (subject, instance) {
				(_, Some(raw)) => {
					let instance: TaggedInstance =
						serde_json::from_str(&raw).context("invalid --instance record")?;
					ability.decide(action, &instance)?
				}
				(Some(subject), None) => {
					let subject: SubjectType = subject.parse()?;
					ability.decide(action, subject)?
				}
				(None, None) => anyhow::bail!("one of --subject or --instance is required"),
			};

			println!("{}", render_decision(&ability, decision, json)?);
			Ok(if decision.allowed {
				ExitCode::SUCCESS
			} else {
				ExitCode::from(1)
			})
		}
		Command::Rules { role, user } => {
			let ability = ability_for(&authorizer, user, &role)?;
			println!("{}", serde_json::to_string_pretty(ability.rules())?);
			Ok(ExitCode::SUCCESS)
		}
		Command::Validate => {
			for (role, count) in authorizer.validate()? {
				println!("{role}: {count} rules");
			}
			Ok(ExitCode::SUCCESS)
		}
	}
}

fn load_config(path: Option<&std::path::Path>) -> Result<AuthConfig> {
	let config = match path {
		Some(path) => saas_auth_config::load_config_with_file(path),
		None => saas_auth_config::load_config(),
	};
	config.context("failed to load configuration")
}

fn init_tracing(logging: &LoggingConfig) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(logging.level.clone()));

	// stdout carries command output
	if logging.json {
		tracing_subscriber::registry()
			.with(filter)
			.with(fmt::layer().json().with_writer(std::io::stderr))
			.init();
	} else {
		tracing_subscriber::registry()
			.with(filter)
			.with(fmt::layer().with_writer(std::io::stderr))
			.init();
	}
}

fn ability_for(authorizer: &Authorizer, user: Uuid, role: &str) -> Result<Ability> {
	let actor = Actor::from_membership(UserId::new(user), role)?;
	Ok(authorizer.ability_for(&actor)?)
}

fn render_decision(ability: &Ability, decision: Decision, json: bool) -> Result<String> {
	let rule = decision.rule_index.and_then(|i| ability.rules().get(i));
	let verdict = if decision.allowed { "allowed" } else { "denied" };

	if json {
		let value = serde_json::json!({
			"allowed": decision.allowed,
			"rule_index": decision.rule_index,
			"rule": rule,
		});
		return Ok(serde_json::to_string_pretty(&value)?);
	}

	Ok(match (decision.rule_index, rule) {
		(Some(index), Some(rule)) => {
			format!("{verdict} by rule {index}: {}", serde_json::to_string(rule)?)
		}
		_ => format!("{verdict}: no rule matched"),
	})
}
