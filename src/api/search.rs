/// Company search endpoint
///
/// Looks up entities by organization number or name and annotates every
/// returned unit with its EHF capability.
use crate::{
    capability::OrgId,
    error::{AppError, AppResult},
    registry::{address, filter_relevant, format_address, Entity, Subunit},
    AppContext,
};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Longest accepted search term
const MAX_QUERY_LEN: usize = 200;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Organization number or company name
    pub q: String,
}

/// Main entity or subunit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UnitKind {
    Main,
    Sub,
}

/// One row in a search result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRow {
    pub org_number: String,
    pub name: String,
    pub address: String,
    pub kind: UnitKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Confirmed EHF capability (false when not confirmed)
    pub ehf: bool,
}

impl From<&Entity> for UnitRow {
    fn from(entity: &Entity) -> Self {
        Self {
            org_number: entity.org_number.clone(),
            name: entity.name.clone(),
            address: format_address(entity.address()),
            kind: UnitKind::Main,
            parent: None,
            ehf: false,
        }
    }
}

impl From<&Subunit> for UnitRow {
    fn from(subunit: &Subunit) -> Self {
        Self {
            org_number: subunit.org_number.clone(),
            name: subunit.name.clone(),
            address: format_address(subunit.location_address.as_ref()),
            kind: UnitKind::Sub,
            parent: subunit.parent.clone(),
            ehf: false,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SearchResponse {
    /// Main entity with all its subunits
    #[serde(rename_all = "camelCase")]
    Entity {
        entity: UnitRow,
        subunits: Vec<UnitRow>,
        total_units: usize,
    },
    /// Subunit with its parent entity, if the parent still exists
    #[serde(rename_all = "camelCase")]
    Subunit {
        subunit: UnitRow,
        parent: Option<UnitRow>,
    },
    /// Name matches across entities and subunits
    #[serde(rename_all = "camelCase")]
    Name { results: Vec<UnitRow> },
}

pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/search", get(search))
}

pub async fn search(
    State(ctx): State<AppContext>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<SearchResponse>> {
    let term = params.q.trim();

    if term.is_empty() {
        return Err(AppError::Validation("Search term cannot be empty".to_string()));
    }
    if term.len() > MAX_QUERY_LEN {
        return Err(AppError::Validation(format!(
            "Search term too long (max {} characters)",
            MAX_QUERY_LEN
        )));
    }

    let org_id = OrgId::new(term);
    let response = if org_id.is_numeric() {
        search_by_number(&ctx, &org_id).await?
    } else {
        search_by_name(&ctx, term).await?
    };

    Ok(Json(response))
}

async fn search_by_number(ctx: &AppContext, org_id: &OrgId) -> AppResult<SearchResponse> {
    if let Some(entity) = ctx.registry.get_entity(org_id).await? {
        let subunits = ctx.registry.list_subunits(org_id).await?;

        // Entity first, then subunits with something to show
        let mut rows = vec![UnitRow::from(&entity)];
        rows.extend(
            subunits
                .iter()
                .filter(|s| {
                    !s.name.trim().is_empty() && address::has_address(s.location_address.as_ref())
                })
                .map(UnitRow::from),
        );

        annotate(ctx, &mut rows).await;

        let subunit_rows = rows.split_off(1);
        let entity_row = rows
            .pop()
            .ok_or_else(|| AppError::Internal("Entity row missing".to_string()))?;
        let total_units = subunit_rows.len() + 1;
        return Ok(SearchResponse::Entity {
            entity: entity_row,
            subunits: subunit_rows,
            total_units,
        });
    }

    match ctx.registry.get_subunit_with_parent(org_id).await? {
        Some((subunit, parent)) => {
            let mut rows = vec![UnitRow::from(&subunit)];
            if let Some(parent) = &parent {
                rows.push(UnitRow::from(parent));
            }
            annotate(ctx, &mut rows).await;

            let mut rows = rows.into_iter();
            let subunit = rows
                .next()
                .ok_or_else(|| AppError::Internal("Subunit row missing".to_string()))?;
            Ok(SearchResponse::Subunit {
                subunit,
                parent: rows.next(),
            })
        }
        None => Err(AppError::NotFound(
            "Ingen treff funnet for organisasjonsnummeret.".to_string(),
        )),
    }
}

async fn search_by_name(ctx: &AppContext, term: &str) -> AppResult<SearchResponse> {
    let (entities, subunits) = tokio::try_join!(
        ctx.registry.search_entities(term),
        ctx.registry.search_subunits(term)
    )?;

    let entities = filter_relevant(term, entities, |e: &Entity| e.name.as_str());
    let subunits = filter_relevant(term, subunits, |s: &Subunit| s.name.as_str());

    let mut results: Vec<UnitRow> = entities
        .iter()
        .map(UnitRow::from)
        .chain(subunits.iter().map(UnitRow::from))
        .collect();

    if results.is_empty() {
        return Err(AppError::NotFound("Ingen treff funnet for navnet.".to_string()));
    }

    annotate(ctx, &mut results).await;
    Ok(SearchResponse::Name { results })
}

/// Fill in `ehf` for every row with one batched resolution
async fn annotate(ctx: &AppContext, rows: &mut [UnitRow]) {
    if rows.is_empty() {
        return;
    }

    let ids: Vec<&str> = rows.iter().map(|row| row.org_number.as_str()).collect();
    let batch = ctx
        .capability_resolver
        .resolve_many_within(&ids, ctx.batch_deadline())
        .await;

    let answers = batch.into_map();
    for row in rows.iter_mut() {
        row.ehf = answers.get(&row.org_number).copied().unwrap_or(false);
    }
}
