//! Composition of one entity path plus its query options.

mod keys;

pub use keys::format_key_segment;

use crate::compile::{BooleanFormat, FilterCompiler};
use crate::error::QueryError;
use crate::predicate::{Entity, Expr, FieldMap, Literal};
use crate::transport::{HttpRequest, Method};
use tracing::debug;

pub const CROSS_COMPANY: &str = "cross-company";
pub const FILTER: &str = "$filter";
pub const SELECT: &str = "$select";
pub const EXPAND: &str = "$expand";
pub const ORDER_BY: &str = "$orderby";
pub const SKIP: &str = "$skip";
pub const TOP: &str = "$top";
pub const COUNT: &str = "$count";

#[derive(Clone, Debug, PartialEq)]
struct ExpandItem {
    navigation: String,
    select: Vec<String>,
}

impl ExpandItem {
    fn render(&self) -> String {
        if self.select.is_empty() {
            self.navigation.clone()
        } else {
            format!("{}({}={})", self.navigation, SELECT, self.select.join(","))
        }
    }
}

/// State of one logical query.
///
/// Consumed by a single execution; clone it to run the same query
/// concurrently.
#[derive(Clone, Debug)]
pub struct Query {
    entity: String,
    field_map: Option<&'static FieldMap>,
    booleans: BooleanFormat,
    cross_company: bool,
    server_filter: Option<Expr>,
    fragments: Vec<(String, String)>,
    expands: Vec<ExpandItem>,
    order_by: Vec<String>,
    local_filter: Option<Expr>,
    limit: Option<usize>,
    page_size: Option<u32>,
    keys: Vec<(String, Literal)>,
}

impl Query {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            field_map: None,
            booleans: BooleanFormat::default(),
            cross_company: false,
            server_filter: None,
            fragments: Vec::new(),
            expands: Vec::new(),
            order_by: Vec::new(),
            local_filter: None,
            limit: None,
            page_size: None,
            keys: Vec::new(),
        }
    }

    /// Query over a typed entity set; its field aliases apply to every
    /// predicate, selection, ordering and key given afterwards.
    pub fn for_entity<E: Entity>() -> Self {
        let mut query = Self::new(E::ENTITY_SET);
        query.field_map = Some(E::field_map());
        query
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn with_boolean_format(mut self, booleans: BooleanFormat) -> Self {
        self.booleans = booleans;
        self
    }

    pub fn boolean_format(&self) -> &BooleanFormat {
        &self.booleans
    }

    /// Request results across all legal entities (companies).
    pub fn cross_company(mut self, enabled: bool) -> Self {
        self.cross_company = enabled;
        self
    }

    fn wire_name(&self, name: &str) -> String {
        self.field_map
            .map_or(name, |map| map.resolve(name))
            .to_string()
    }

    fn remap(&self, expr: Expr) -> Expr {
        match self.field_map {
            Some(map) => expr.remap(map),
            None => expr,
        }
    }

    /// Replaces the fragment in place, or appends it.
    fn set_fragment(&mut self, name: &str, value: String) {
        match self.fragments.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = value,
            None => self.fragments.push((name.to_string(), value)),
        }
    }

    fn remove_fragment(&mut self, name: &str) {
        self.fragments.retain(|(n, _)| n != name);
    }

    /// Server-side filter. Replaces any earlier `$filter` rather than
    /// AND-merging with it.
    ///
    /// Unsupported shapes are rejected here; the clause itself is rendered
    /// when the request is built, with the boolean format in effect then.
    pub fn filter(mut self, predicate: Expr) -> Result<Self, QueryError> {
        let predicate = self.remap(predicate);
        let clause = FilterCompiler::new(self.booleans.clone()).compile(&predicate)?;
        debug!(entity = %self.entity, filter = %clause, "Accepted server-side filter");
        self.remove_fragment(FILTER);
        self.server_filter = Some(predicate);
        Ok(self)
    }

    /// The `$filter` clause as it would be sent now.
    pub fn filter_clause(&self) -> Result<Option<String>, QueryError> {
        self.server_filter
            .as_ref()
            .map(|predicate| FilterCompiler::new(self.booleans.clone()).compile(predicate))
            .transpose()
    }

    /// Client-side filter, evaluated against each record as pages arrive.
    /// Replaces any earlier client-side predicate.
    pub fn filter_local(mut self, predicate: Expr) -> Self {
        self.local_filter = Some(self.remap(predicate));
        self
    }

    pub fn local_filter(&self) -> Option<&Expr> {
        self.local_filter.as_ref()
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields: Vec<String> = fields
            .into_iter()
            .map(|f| self.wire_name(f.as_ref()))
            .collect();
        if fields.is_empty() {
            self.remove_fragment(SELECT);
        } else {
            self.set_fragment(SELECT, fields.join(","));
        }
        self
    }

    pub fn expand(self, navigation: &str) -> Self {
        self.expand_select(navigation, Vec::<&str>::new())
    }

    /// Adds `navigation($select=...)` to the single `$expand` option.
    /// Expanding the same navigation again replaces its selection.
    pub fn expand_select<I, S>(mut self, navigation: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let item = ExpandItem {
            navigation: self.wire_name(navigation),
            select: fields.into_iter().map(|f| f.as_ref().to_string()).collect(),
        };
        match self
            .expands
            .iter_mut()
            .find(|e| e.navigation == item.navigation)
        {
            Some(existing) => *existing = item,
            None => self.expands.push(item),
        }
        let rendered: Vec<String> = self.expands.iter().map(ExpandItem::render).collect();
        self.set_fragment(EXPAND, rendered.join(","));
        self
    }

    pub fn order_by(self, field: &str) -> Self {
        self.push_order(field, false)
    }

    pub fn order_by_desc(self, field: &str) -> Self {
        self.push_order(field, true)
    }

    fn push_order(mut self, field: &str, descending: bool) -> Self {
        let name = self.wire_name(field);
        self.order_by.push(if descending {
            format!("{name} desc")
        } else {
            name
        });
        let joined = self.order_by.join(",");
        self.set_fragment(ORDER_BY, joined);
        self
    }

    pub fn skip(mut self, n: u64) -> Self {
        self.set_fragment(SKIP, n.to_string());
        self
    }

    pub fn top(mut self, n: u64) -> Self {
        self.set_fragment(TOP, n.to_string());
        self
    }

    /// Ask the service for `@odata.count`.
    pub fn count(mut self) -> Self {
        self.set_fragment(COUNT, "true".to_string());
        self
    }

    /// Any other query option, passed through verbatim. A verbatim `$filter`
    /// replaces the server-side predicate.
    pub fn option(mut self, name: &str, value: impl Into<String>) -> Self {
        if name == FILTER {
            self.server_filter = None;
        }
        self.set_fragment(name, value.into());
        self
    }

    /// Stop once this many records have been collected.
    pub fn limit(mut self, cap: usize) -> Self {
        self.limit = Some(cap);
        self
    }

    pub fn result_limit(&self) -> Option<usize> {
        self.limit
    }

    /// Preferred server page size, sent as `Prefer: odata.maxpagesize`.
    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Identity key for single-record operations; setting the same key again
    /// replaces its value.
    pub fn key(mut self, name: &str, value: impl Into<Literal>) -> Self {
        let name = self.wire_name(name);
        let value = value.into();
        match self.keys.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = value,
            None => self.keys.push((name, value)),
        }
        self
    }

    pub fn fragment(&self, name: &str) -> Option<&str> {
        self.fragments
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Query options in wire order, unencoded. The tenant-scope flag always
    /// comes first, then `$filter`.
    pub fn query_pairs(&self) -> Result<Vec<(String, String)>, QueryError> {
        let mut pairs = Vec::with_capacity(self.fragments.len() + 2);
        if self.cross_company {
            pairs.push((CROSS_COMPANY.to_string(), "true".to_string()));
        }
        if let Some(clause) = self.filter_clause()? {
            pairs.push((FILTER.to_string(), clause));
        }
        pairs.extend(self.fragments.iter().cloned());
        Ok(pairs)
    }

    /// Entity path plus options; exactly the entity path when there are none.
    pub fn build_path(&self) -> Result<String, QueryError> {
        Ok(self.collection_request()?.target())
    }

    /// `Entity(key=value,...)` for single-record operations.
    pub fn key_path(&self) -> Result<String, QueryError> {
        if self.keys.is_empty() {
            return Err(QueryError::MissingKey {
                entity: self.entity.clone(),
            });
        }
        Ok(format!(
            "{}{}",
            self.entity,
            format_key_segment(&self.keys, &self.booleans)
        ))
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if let Some(size) = self.page_size {
            headers.push(("Prefer".to_string(), format!("odata.maxpagesize={size}")));
        }
        headers
    }

    /// First-page request for the collection.
    pub fn collection_request(&self) -> Result<HttpRequest, QueryError> {
        let mut request = HttpRequest::get(self.entity.clone()).with_query(self.query_pairs()?);
        request.headers = self.headers();
        Ok(request)
    }

    /// Request addressed to the keyed record. Only the tenant-scope flag
    /// travels with it.
    pub fn key_request(&self, method: Method) -> Result<HttpRequest, QueryError> {
        let mut request = HttpRequest::new(method, self.key_path()?);
        if self.cross_company {
            request
                .query
                .push((CROSS_COMPANY.to_string(), "true".to_string()));
        }
        request
            .headers
            .push(("Accept".to_string(), "application/json".to_string()));
        Ok(request)
    }
}
