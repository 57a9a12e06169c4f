//! Collection command handlers: list, browse, search, create, update, delete.

use std::num::NonZeroUsize;

use tracing::debug;

use nutridash_core::{Dashboard, ResourceKind};

use crate::cli::{
    BrowseArgs, CreateArgs, DeleteArgs, GlobalOpts, ListArgs, SearchArgs, UpdateArgs,
};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn list(dashboard: &Dashboard, args: ListArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let kind = ResourceKind::from(args.kind);
    let size = match args.size {
        Some(size) => NonZeroUsize::new(size).ok_or_else(|| CliError::Validation {
            field: "size".into(),
            reason: "must be at least 1".into(),
        })?,
        None => dashboard.config().page_size,
    };

    let cancel = dashboard.child_token();
    let window = dashboard
        .fetcher()
        .fetch_page(kind, args.page, size, &cancel)
        .await?;

    output::print_output(&output::render_items(&global.output, &window.items)?, global.quiet);
    if !window.last && !global.quiet {
        eprintln!("More {kind} available: --page {}", window.number + 1);
    }
    Ok(())
}

/// Load page 0, then keep "scrolling" until the list reports its last page.
pub async fn browse(
    dashboard: &Dashboard,
    args: BrowseArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let kind = ResourceKind::from(args.kind);
    let session = dashboard.session(kind);

    session.load_first_page().await?;
    let mut pages = 1;
    while !session.view().last && args.max_pages.is_none_or(|max| pages < max) {
        if !session.on_sentinel_visible().await? {
            break;
        }
        pages += 1;
    }

    let view = session.view();
    debug!(%kind, pages, rows = view.browse.len(), "browse finished");
    output::print_output(&output::render_items(&global.output, &view.browse)?, global.quiet);
    if !view.last && !global.quiet {
        eprintln!("Stopped after {pages} pages; more {kind} available");
    }
    session.close();
    Ok(())
}

pub async fn search(
    dashboard: &Dashboard,
    args: SearchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let kind = ResourceKind::from(args.kind);
    let query = args.query.trim();
    if query.is_empty() {
        return Err(CliError::Validation {
            field: "query".into(),
            reason: "search text is empty".into(),
        });
    }

    let session = dashboard.session(kind);
    session.set_query(query);
    let view = session.search_settled().await;
    session.close();

    if let Some(message) = view.search.error() {
        return Err(CliError::Search {
            message: message.to_owned(),
        });
    }
    output::print_output(&output::render_items(&global.output, &view.displayed())?, global.quiet);
    Ok(())
}

pub async fn create(
    dashboard: &Dashboard,
    args: CreateArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let kind = ResourceKind::from(args.kind);
    let payload = util::build_payload(&args.fields, true)?;

    match dashboard.mutator().create(kind, &payload).await? {
        Some(item) => {
            output::print_output(&output::render_item(&global.output, &item)?, global.quiet);
        }
        None => {
            if !global.quiet {
                eprintln!("{} created", capitalized(kind.singular()));
            }
        }
    }
    Ok(())
}

pub async fn update(
    dashboard: &Dashboard,
    args: UpdateArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let kind = ResourceKind::from(args.kind);
    let payload = util::build_payload(&args.fields, false)?;

    let updated = dashboard.mutator().update(kind, &args.id, &payload, None).await?;
    if !updated.partial {
        output::print_output(&output::render_item(&global.output, &updated.item)?, global.quiet);
        return Ok(());
    }
    if !global.quiet {
        eprintln!(
            "{} updated; the server returned no copy, showing submitted fields",
            capitalized(kind.singular())
        );
    }
    let out = output::render_submitted(&global.output, &args.id, &payload)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn delete(
    dashboard: &Dashboard,
    args: DeleteArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let kind = ResourceKind::from(args.kind);
    let prompt = format!("Delete {} '{}'? This cannot be undone.", kind.singular(), args.id);
    if !util::confirm(&prompt, global.yes)? {
        return Ok(());
    }

    dashboard.mutator().delete(kind, &args.id).await?;
    if !global.quiet {
        eprintln!("{} deleted", capitalized(kind.singular()));
    }
    Ok(())
}

fn capitalized(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
