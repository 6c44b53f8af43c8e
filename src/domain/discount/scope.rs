//! Discount scope and the resolver that matches it against a cart.
//!
//! A scope names the subset of line items a discount may reduce. Inclusion is
//! decided by the scope variant; exclusions are applied afterwards for every
//! variant, including `All`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{CategoryId, Money, ProductId, UserId, ValidationError, VariantId};

use super::{CartLineItem, CartSnapshot};

/// What a discount applies to.
///
/// Non-`All` variants always carry a non-empty id set; [`DiscountScope::from_parts`]
/// folds an empty set into `All`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "applicable_to", content = "applicable_ids", rename_all = "snake_case")]
pub enum DiscountScope {
    #[default]
    All,
    Product(BTreeSet<ProductId>),
    Variant(BTreeSet<VariantId>),
    Category(BTreeSet<CategoryId>),
    /// Restricted to the listed shoppers; does not filter line items.
    User(BTreeSet<UserId>),
}

/// Discriminator of a [`DiscountScope`], as persisted in `applicable_to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    All,
    Product,
    Variant,
    Category,
    User,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::All => "all",
            ScopeKind::Product => "product",
            ScopeKind::Variant => "variant",
            ScopeKind::Category => "category",
            ScopeKind::User => "user",
        }
    }

    /// Tie-break rank: variant > product > category > all/user.
    pub fn specificity(&self) -> u8 {
        match self {
            ScopeKind::Variant => 3,
            ScopeKind::Product => 2,
            ScopeKind::Category => 1,
            ScopeKind::All | ScopeKind::User => 0,
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ScopeKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(ScopeKind::All),
            "product" => Ok(ScopeKind::Product),
            "variant" => Ok(ScopeKind::Variant),
            "category" => Ok(ScopeKind::Category),
            "user" => Ok(ScopeKind::User),
            other => Err(ValidationError::invalid_format(
                "applicable_to",
                format!("unknown scope '{}'", other),
            )),
        }
    }
}

impl DiscountScope {
    /// Builds a scope from its persisted parts, normalizing an empty id set to `All`.
    ///
    /// Ids supplied with `All` are discarded.
    pub fn from_parts<I, S>(kind: ScopeKind, ids: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();

        let scope = match kind {
            ScopeKind::All => DiscountScope::All,
            ScopeKind::Product => DiscountScope::Product(collect_ids(ids, ProductId::new)?),
            ScopeKind::Variant => DiscountScope::Variant(collect_ids(ids, VariantId::new)?),
            ScopeKind::Category => DiscountScope::Category(collect_ids(ids, CategoryId::new)?),
            ScopeKind::User => DiscountScope::User(collect_ids(ids, UserId::new)?),
        };

        Ok(scope.normalized())
    }

    /// Folds an empty non-`All` scope into `All`.
    pub fn normalized(self) -> Self {
        let empty = match &self {
            DiscountScope::All => false,
            DiscountScope::Product(ids) => ids.is_empty(),
            DiscountScope::Variant(ids) => ids.is_empty(),
            DiscountScope::Category(ids) => ids.is_empty(),
            DiscountScope::User(ids) => ids.is_empty(),
        };
        if empty {
            DiscountScope::All
        } else {
            self
        }
    }

    pub fn kind(&self) -> ScopeKind {
        match self {
            DiscountScope::All => ScopeKind::All,
            DiscountScope::Product(_) => ScopeKind::Product,
            DiscountScope::Variant(_) => ScopeKind::Variant,
            DiscountScope::Category(_) => ScopeKind::Category,
            DiscountScope::User(_) => ScopeKind::User,
        }
    }

    /// The id set as plain strings, empty for `All`.
    pub fn ids(&self) -> Vec<String> {
        match self {
            DiscountScope::All => Vec::new(),
            DiscountScope::Product(ids) => ids.iter().map(|id| id.as_str().to_string()).collect(),
            DiscountScope::Variant(ids) => ids.iter().map(|id| id.as_str().to_string()).collect(),
            DiscountScope::Category(ids) => ids.iter().map(|id| id.as_str().to_string()).collect(),
            DiscountScope::User(ids) => ids.iter().map(|id| id.as_str().to_string()).collect(),
        }
    }

    fn includes(&self, item: &CartLineItem) -> bool {
        match self {
            DiscountScope::All | DiscountScope::User(_) => true,
            DiscountScope::Product(ids) => ids.contains(item.product_id()),
            DiscountScope::Variant(ids) => item.variant_id().is_some_and(|v| ids.contains(v)),
            DiscountScope::Category(ids) => item.category_id().is_some_and(|c| ids.contains(c)),
        }
    }
}

fn collect_ids<T: Ord>(
    ids: Vec<String>,
    parse: impl Fn(String) -> Result<T, ValidationError>,
) -> Result<BTreeSet<T>, ValidationError> {
    ids.into_iter().map(parse).collect()
}

/// Denylist applied after scope inclusion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusions {
    #[serde(default)]
    pub products: BTreeSet<ProductId>,
    #[serde(default)]
    pub categories: BTreeSet<CategoryId>,
}

impl Exclusions {
    fn excludes(&self, item: &CartLineItem) -> bool {
        self.products.contains(item.product_id())
            || item.category_id().is_some_and(|c| self.categories.contains(c))
    }
}

/// Line items a discount may reduce, and their combined total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeMatch {
    /// Indices into `CartSnapshot::items`, ascending.
    pub indices: Vec<usize>,
    /// Sum of the matched line totals.
    pub eligible_subtotal: Money,
}

impl ScopeMatch {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Matches a scope and its exclusions against cart line items.
pub struct ScopeResolver;

impl ScopeResolver {
    /// Returns the matching line items. An empty match means the discount
    /// does not apply to this cart.
    pub fn resolve(scope: &DiscountScope, exclusions: &Exclusions, cart: &CartSnapshot) -> ScopeMatch {
        let mut indices = Vec::new();
        let mut eligible_subtotal = Money::ZERO;

        for (index, item) in cart.items().iter().enumerate() {
            if scope.includes(item) && !exclusions.excludes(item) {
                indices.push(index);
                eligible_subtotal = eligible_subtotal + item.line_total();
            }
        }

        ScopeMatch {
            indices,
            eligible_subtotal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn item(product: &str, variant: Option<&str>, category: Option<&str>, total: Decimal) -> CartLineItem {
        let mut line = CartLineItem::new(
            ProductId::new(product).unwrap(),
            1,
            Money::try_new(total).unwrap(),
        )
        .unwrap();
        if let Some(v) = variant {
            line = line.with_variant(VariantId::new(v).unwrap());
        }
        if let Some(c) = category {
            line = line.with_category(CategoryId::new(c).unwrap());
        }
        line
    }

    fn sample_cart() -> CartSnapshot {
        CartSnapshot::new(vec![
            item("shoe", Some("shoe-red-42"), Some("footwear"), dec!(80)),
            item("sock", Some("sock-black"), Some("accessories"), dec!(5)),
            item("hat", None, Some("accessories"), dec!(15)),
        ])
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Normalization
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn empty_non_all_scope_normalizes_to_all() {
        let scope = DiscountScope::from_parts(ScopeKind::Category, Vec::<String>::new()).unwrap();
        assert_eq!(scope, DiscountScope::All);
    }

    #[test]
    fn all_scope_discards_ids() {
        let scope = DiscountScope::from_parts(ScopeKind::All, vec!["p1"]).unwrap();
        assert_eq!(scope, DiscountScope::All);
        assert!(scope.ids().is_empty());
    }

    #[test]
    fn from_parts_rejects_blank_ids() {
        assert!(DiscountScope::from_parts(ScopeKind::Product, vec![""]).is_err());
    }

    #[test]
    fn scope_serializes_adjacently_tagged() {
        let scope = DiscountScope::from_parts(ScopeKind::Product, vec!["p1"]).unwrap();
        let json = serde_json::to_value(&scope).unwrap();
        assert_eq!(json["applicable_to"], "product");
        assert_eq!(json["applicable_ids"][0], "p1");
    }

    #[test]
    fn specificity_orders_variant_first() {
        assert!(ScopeKind::Variant.specificity() > ScopeKind::Product.specificity());
        assert!(ScopeKind::Product.specificity() > ScopeKind::Category.specificity());
        assert!(ScopeKind::Category.specificity() > ScopeKind::All.specificity());
        assert_eq!(ScopeKind::All.specificity(), ScopeKind::User.specificity());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Matching
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn all_scope_matches_every_line() {
        let m = ScopeResolver::resolve(&DiscountScope::All, &Exclusions::default(), &sample_cart());
        assert_eq!(m.indices, vec![0, 1, 2]);
        assert_eq!(m.eligible_subtotal.amount(), dec!(100));
    }

    #[test]
    fn product_scope_matches_listed_products() {
        let scope = DiscountScope::from_parts(ScopeKind::Product, vec!["hat"]).unwrap();
        let m = ScopeResolver::resolve(&scope, &Exclusions::default(), &sample_cart());
        assert_eq!(m.indices, vec![2]);
        assert_eq!(m.eligible_subtotal.amount(), dec!(15));
    }

    #[test]
    fn variant_scope_ignores_lines_without_variant() {
        let scope = DiscountScope::from_parts(ScopeKind::Variant, vec!["sock-black"]).unwrap();
        let m = ScopeResolver::resolve(&scope, &Exclusions::default(), &sample_cart());
        assert_eq!(m.indices, vec![1]);
    }

    #[test]
    fn category_scope_matches_category_members() {
        let scope = DiscountScope::from_parts(ScopeKind::Category, vec!["accessories"]).unwrap();
        let m = ScopeResolver::resolve(&scope, &Exclusions::default(), &sample_cart());
        assert_eq!(m.indices, vec![1, 2]);
        assert_eq!(m.eligible_subtotal.amount(), dec!(20));
    }

    #[test]
    fn user_scope_does_not_filter_lines() {
        let scope = DiscountScope::from_parts(ScopeKind::User, vec!["u1"]).unwrap();
        let m = ScopeResolver::resolve(&scope, &Exclusions::default(), &sample_cart());
        assert_eq!(m.indices.len(), 3);
    }

    #[test]
    fn unmatched_category_yields_empty_match() {
        let scope = DiscountScope::from_parts(ScopeKind::Category, vec!["catA"]).unwrap();
        let m = ScopeResolver::resolve(&scope, &Exclusions::default(), &sample_cart());
        assert!(m.is_empty());
        assert_eq!(m.eligible_subtotal, Money::ZERO);
    }

    #[test]
    fn exclusions_apply_to_all_scope() {
        let exclusions = Exclusions {
            products: [ProductId::new("shoe").unwrap()].into_iter().collect(),
            categories: BTreeSet::new(),
        };
        let m = ScopeResolver::resolve(&DiscountScope::All, &exclusions, &sample_cart());
        assert_eq!(m.indices, vec![1, 2]);
    }

    #[test]
    fn exclusions_apply_after_inclusion_for_scoped_discounts() {
        let scope = DiscountScope::from_parts(ScopeKind::Category, vec!["accessories"]).unwrap();
        let exclusions = Exclusions {
            products: [ProductId::new("sock").unwrap()].into_iter().collect(),
            categories: BTreeSet::new(),
        };
        let m = ScopeResolver::resolve(&scope, &exclusions, &sample_cart());
        assert_eq!(m.indices, vec![2]);
    }

    #[test]
    fn excluded_category_removes_product_matches() {
        let scope = DiscountScope::from_parts(ScopeKind::Product, vec!["sock", "shoe"]).unwrap();
        let exclusions = Exclusions {
            products: BTreeSet::new(),
            categories: [CategoryId::new("footwear").unwrap()].into_iter().collect(),
        };
        let m = ScopeResolver::resolve(&scope, &exclusions, &sample_cart());
        assert_eq!(m.indices, vec![1]);
    }

    proptest! {
        #[test]
        fn all_scope_without_exclusions_covers_full_subtotal(
            cents in proptest::collection::vec(0u32..1_000_000, 0..20)
        ) {
            let items = cents
                .iter()
                .enumerate()
                .map(|(i, c)| item(&format!("p{}", i), None, None, Decimal::new(i64::from(*c), 2)))
                .collect();
            let cart = CartSnapshot::new(items);
            let m = ScopeResolver::resolve(&DiscountScope::All, &Exclusions::default(), &cart);
            prop_assert_eq!(m.eligible_subtotal, cart.subtotal());
            prop_assert_eq!(m.indices.len(), cart.line_count());
        }
    }
}
