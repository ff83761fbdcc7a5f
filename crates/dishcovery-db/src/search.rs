//! Recipe search filter.
//!
//! A filter is a conjunction of up to three conditions. Each one is only
//! emitted when its parameter was supplied:
//!
//! - keyword: case-insensitive substring of title OR description, OR an
//!   ingredient whose name equals the keyword (case-insensitive)
//! - vegan only: `is_vegan = 1`
//! - excluded allergens: the allergen array shares no element with the list

use dishcovery_types::api::SearchQuery;
use rusqlite::types::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub keyword: Option<String>,
    pub vegan_only: bool,
    pub exclude_allergens: Vec<String>,
}

impl RecipeFilter {
    /// Blank parameters count as absent.
    pub fn from_query(query: &SearchQuery) -> Self {
        let keyword = query
            .keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        let vegan_only = query.is_vegan.as_deref() == Some("true");

        let mut exclude_allergens: Vec<String> = Vec::new();
        for allergen in query.exclude_allergens.as_deref().unwrap_or_default().split(',') {
            let allergen = allergen.trim().to_lowercase();
            if !allergen.is_empty() && !exclude_allergens.contains(&allergen) {
                exclude_allergens.push(allergen);
            }
        }

        Self {
            keyword,
            vegan_only,
            exclude_allergens,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keyword.is_none() && !self.vegan_only && self.exclude_allergens.is_empty()
    }

    /// Render the filter as the body of a WHERE clause over the
    /// `recipes r` alias, plus positional parameters in order.
    /// An empty filter renders as an empty clause.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(keyword) = &self.keyword {
            // SQLite's own LIKE and lower() only fold ASCII
            let folded = keyword.to_lowercase();
            let pattern = format!("%{}%", escape_like(&folded));
            params.push(Value::Text(pattern.clone()));
            params.push(Value::Text(pattern));
            params.push(Value::Text(folded));
            clauses.push(
                "(unicode_lower(r.title) LIKE ? ESCAPE '\\' \
                 OR unicode_lower(r.description) LIKE ? ESCAPE '\\' \
                 OR EXISTS (SELECT 1 FROM json_each(r.ingredients) i \
                            WHERE unicode_lower(json_extract(i.value, '$.name')) = ?))"
                    .to_string(),
            );
        }

        if self.vegan_only {
            clauses.push("r.is_vegan = 1".to_string());
        }

        if !self.exclude_allergens.is_empty() {
            let placeholders = vec!["?"; self.exclude_allergens.len()].join(", ");
            clauses.push(format!(
                "NOT EXISTS (SELECT 1 FROM json_each(r.allergens) a WHERE a.value IN ({placeholders}))"
            ));
            params.extend(self.exclude_allergens.iter().cloned().map(Value::Text));
        }

        (clauses.join(" AND "), params)
    }
}

/// Escape LIKE wildcards so the keyword matches literally.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use crate::models::RecipeRecord;
    use dishcovery_types::models::Ingredient;

    fn query(keyword: Option<&str>, vegan: Option<&str>, exclude: Option<&str>) -> SearchQuery {
        SearchQuery {
            keyword: keyword.map(Into::into),
            is_vegan: vegan.map(Into::into),
            exclude_allergens: exclude.map(Into::into),
        }
    }

    #[test]
    fn absent_and_blank_parameters_are_omitted() {
        let filter = RecipeFilter::from_query(&query(Some("   "), Some("false"), Some(" , ,")));
        assert!(filter.is_empty());
        let (clause, params) = filter.to_sql();
        assert!(clause.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn only_literal_true_enables_vegan() {
        assert!(RecipeFilter::from_query(&query(None, Some("true"), None)).vegan_only);
        assert!(!RecipeFilter::from_query(&query(None, Some("TRUE"), None)).vegan_only);
        assert!(!RecipeFilter::from_query(&query(None, Some("1"), None)).vegan_only);
    }

    #[test]
    fn conditions_are_anded_with_params_in_order() {
        let filter = RecipeFilter::from_query(&query(Some("Tofu"), Some("true"), Some("Peanut, dairy")));
        assert_eq!(filter.exclude_allergens, vec!["peanut", "dairy"]);

        let (clause, params) = filter.to_sql();
        assert_eq!(clause.matches(" AND ").count(), 2);
        assert_eq!(params.len(), 5);
        assert_eq!(params[0], Value::Text("%tofu%".into()));
        assert_eq!(params[2], Value::Text("tofu".into()));
        assert_eq!(params[4], Value::Text("dairy".into()));
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    fn seed(db: &Database, title: &str, ingredient: &str, vegan: bool, allergens: &[&str]) {
        db.insert_recipe(&RecipeRecord {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: None,
            ingredients: vec![Ingredient {
                name: ingredient.into(),
                quantity: "1".into(),
            }],
            steps: vec![],
            prep_time: 5,
            cook_time: 5,
            servings: 1,
            is_vegan: vegan,
            allergens: allergens.iter().map(|a| a.to_string()).collect(),
            seo_tags: vec![],
            comments_enabled: true,
            image: None,
            created_by: "nobody".into(),
        })
        .unwrap();
    }

    fn titles(db: &Database, q: SearchQuery) -> Vec<String> {
        db.search_recipes(&RecipeFilter::from_query(&q))
            .unwrap()
            .into_iter()
            .map(|r| r.record.title)
            .collect()
    }

    #[test]
    fn search_runs_against_sqlite() {
        let db = Database::open_in_memory().unwrap();
        seed(&db, "Peanut Noodles", "noodles", true, &["peanut"]);
        seed(&db, "Cheese Toast", "bread", false, &["dairy", "gluten"]);
        seed(&db, "Green Salad", "lettuce", true, &[]);

        assert_eq!(titles(&db, query(None, None, None)).len(), 3);
        assert_eq!(titles(&db, query(Some("toast"), None, None)), vec!["Cheese Toast"]);
        assert_eq!(titles(&db, query(Some("LETTUCE"), None, None)), vec!["Green Salad"]);
        assert_eq!(
            titles(&db, query(None, Some("true"), None)),
            vec!["Peanut Noodles", "Green Salad"]
        );
        assert_eq!(
            titles(&db, query(None, None, Some("peanut,dairy"))),
            vec!["Green Salad"]
        );
        assert!(titles(&db, query(Some("%"), None, None)).is_empty());
    }

    #[test]
    fn keyword_folds_non_ascii_case() {
        let db = Database::open_in_memory().unwrap();
        seed(&db, "Crème Brûlée", "Œufs", false, &["dairy", "egg"]);
        seed(&db, "Creme Soda", "soda", true, &[]);

        assert_eq!(titles(&db, query(Some("CRÈME"), None, None)), vec!["Crème Brûlée"]);
        assert_eq!(titles(&db, query(Some("brûlée"), None, None)), vec!["Crème Brûlée"]);
        assert_eq!(titles(&db, query(Some("BRÛLÉE"), None, None)), vec!["Crème Brûlée"]);
        assert_eq!(titles(&db, query(Some("œufs"), None, None)), vec!["Crème Brûlée"]);
    }
}
