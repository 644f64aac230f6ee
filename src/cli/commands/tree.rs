//! Hierarchy inspection commands

use anyhow::Context;

use crate::config::Config;
use crate::db::{Account, Store};
use crate::domain::Relative;
use crate::hierarchy::HierarchyEngine;

async fn open(config: &Config) -> anyhow::Result<(Store, HierarchyEngine)> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;
    let engine = HierarchyEngine::new(store.edge_store());
    Ok((store, engine))
}

async fn resolve(store: &Store, code: &str) -> anyhow::Result<Account> {
    store
        .get_account_by_referral_code(code)
        .await?
        .with_context(|| format!("No account with referral code '{code}'"))
}

async fn print_members(store: &Store, members: &[Relative]) -> anyhow::Result<()> {
    println!("{:>5}  {:<10} {:<10} {}", "DEPTH", "USERNAME", "CODE", "NAME");
    println!("{:-<60}", "");

    for member in members {
        match store.get_account(member.account).await? {
            Some(account) => println!(
                "{:>5}  {:<10} {:<10} {} {}",
                member.depth,
                account.username,
                account.referral_code,
                account.first_name,
                account.last_name
            ),
            None => println!("{:>5}  #{}", member.depth, member.account),
        }
    }

    Ok(())
}

pub async fn cmd_ancestors(config: &Config, code: &str) -> anyhow::Result<()> {
    let (store, engine) = open(config).await?;
    let account = resolve(&store, code).await?;
    let ancestors = engine.ancestors_of(account.id).await?;

    if ancestors.is_empty() {
        println!("{} is not attached to the hierarchy.", account.username);
        return Ok(());
    }

    println!("Upline of {} ({} levels)", account.username, ancestors.len() - 1);
    print_members(&store, &ancestors).await
}

pub async fn cmd_descendants(
    config: &Config,
    code: &str,
    max_depth: Option<u32>,
) -> anyhow::Result<()> {
    let (store, engine) = open(config).await?;
    let account = resolve(&store, code).await?;
    let descendants = engine.descendants_of(account.id, max_depth).await?;

    if descendants.is_empty() {
        println!("{} is not attached to the hierarchy.", account.username);
        return Ok(());
    }

    println!(
        "Downline of {} ({} members)",
        account.username,
        descendants.len() - 1
    );
    print_members(&store, &descendants).await
}

pub async fn cmd_team(config: &Config, code: &str, max_depth: Option<u32>) -> anyhow::Result<()> {
    let (store, engine) = open(config).await?;
    let account = resolve(&store, code).await?;
    let summary = engine.team_summary(account.id, max_depth).await?;

    println!("Team of {}: {} members", account.username, summary.total);
    for (depth, count) in &summary.levels {
        println!("  Level {depth}: {count}");
    }

    Ok(())
}
