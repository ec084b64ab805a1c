use std::cmp::Ordering;

use crate::database::models::discipline::Discipline;

/// Display order for disciplines: favorites first, then the explicit
/// `sort_order` (rows without one go last), then name.
pub fn compare(a: &Discipline, b: &Discipline) -> Ordering {
    b.is_favorite
        .cmp(&a.is_favorite)
        .then_with(|| match (a.sort_order, b.sort_order) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort and renumber so `sort_order` runs 0..N-1 in display order.
pub fn resequence(mut disciplines: Vec<Discipline>) -> Vec<Discipline> {
    disciplines.sort_by(compare);
    for (index, discipline) in disciplines.iter_mut().enumerate() {
        discipline.sort_order = Some(index as i32);
    }
    disciplines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn discipline(name: &str, is_favorite: bool, sort_order: Option<i32>) -> Discipline {
        Discipline {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            name: name.to_string(),
            code: None,
            professor: None,
            color: None,
            semester: None,
            workload_hours: None,
            is_favorite,
            sort_order,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn names(disciplines: &[Discipline]) -> Vec<&str> {
        disciplines.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn favorites_then_order_then_name() {
        let input = vec![
            discipline("Physics", false, Some(0)),
            discipline("Calculus", true, Some(3)),
            discipline("Algebra", false, None),
            discipline("Chemistry", true, Some(1)),
            discipline("biology", false, Some(0)),
            discipline("Art", true, None),
            discipline("Databases", false, None),
        ];

        let ordered = resequence(input);

        assert_eq!(
            names(&ordered),
            vec!["Chemistry", "Calculus", "Art", "biology", "Physics", "Algebra", "Databases"]
        );
        let orders: Vec<i32> = ordered.iter().map(|d| d.sort_order.unwrap()).collect();
        assert_eq!(orders, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn resequence_is_stable_on_already_sequenced_input() {
        let first = resequence(vec![
            discipline("B", false, Some(5)),
            discipline("A", false, Some(9)),
            discipline("C", true, None),
        ]);
        let ids: Vec<Uuid> = first.iter().map(|d| d.id).collect();

        let second = resequence(first.into_iter().rev().collect());
        assert_eq!(second.iter().map(|d| d.id).collect::<Vec<_>>(), ids);
    }

    #[test]
    fn empty_input_is_fine() {
        assert!(resequence(Vec::new()).is_empty());
    }
}
