use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::FromRow;

/// One recipe-ingredient line from some recipe in the cart.
#[derive(Debug, Clone, FromRow)]
pub struct IngredientLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// One aggregated entry of the shopping list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

/// Groups lines by (name, unit) and sums amounts. Ordering is name
/// ascending, then unit, so repeated downloads are byte-identical.
pub fn aggregate(lines: Vec<IngredientLine>) -> Vec<ShoppingListItem> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for line in lines {
        *totals
            .entry((line.name, line.measurement_unit))
            .or_insert(0) += i64::from(line.amount);
    }
    totals
        .into_iter()
        .map(|((name, measurement_unit), total_amount)| ShoppingListItem {
            name,
            measurement_unit,
            total_amount,
        })
        .collect()
}

/// Plain-text rendering, one line per ingredient.
pub fn render(items: &[ShoppingListItem]) -> String {
    items
        .iter()
        .map(|it| format!("{} ({}) — {}", it.name, it.measurement_unit, it.total_amount))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, unit: &str, amount: i32) -> IngredientLine {
        IngredientLine {
            name: name.into(),
            measurement_unit: unit.into(),
            amount,
        }
    }

    #[test]
    fn empty_cart_yields_empty_list() {
        assert!(aggregate(vec![]).is_empty());
        assert_eq!(render(&[]), "");
    }

    #[test]
    fn sums_across_recipes_and_sorts_by_name() {
        // Recipe A: flour 200 g, egg 2 pcs; Recipe B: flour 100 g.
        let items = aggregate(vec![
            line("flour", "g", 200),
            line("egg", "pcs", 2),
            line("flour", "g", 100),
        ]);
        assert_eq!(
            items,
            vec![
                ShoppingListItem {
                    name: "egg".into(),
                    measurement_unit: "pcs".into(),
                    total_amount: 2,
                },
                ShoppingListItem {
                    name: "flour".into(),
                    measurement_unit: "g".into(),
                    total_amount: 300,
                },
            ]
        );
    }

    #[test]
    fn same_name_different_unit_stays_separate() {
        let items = aggregate(vec![
            line("milk", "ml", 500),
            line("milk", "l", 1),
            line("milk", "ml", 250),
        ]);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].measurement_unit, "l");
        assert_eq!(items[0].total_amount, 1);
        assert_eq!(items[1].measurement_unit, "ml");
        assert_eq!(items[1].total_amount, 750);
    }

    #[test]
    fn totals_do_not_overflow_i32() {
        let items = aggregate(vec![line("rice", "g", i32::MAX), line("rice", "g", i32::MAX)]);
        assert_eq!(items[0].total_amount, 2 * i64::from(i32::MAX));
    }

    #[test]
    fn renders_one_line_per_ingredient() {
        let items = aggregate(vec![line("flour", "g", 300), line("egg", "pcs", 2)]);
        assert_eq!(render(&items), "egg (pcs) — 2\nflour (g) — 300");
    }
}
