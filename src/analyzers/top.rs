use std::collections::HashMap;

use crate::types::RawFlightRecord;

/// How many airlines a snapshot keeps.
pub const TOP_AIRLINES: usize = 5;

/// Returns the names of the busiest airlines in `records`, most flights first.
///
/// Airlines with the same number of flights keep the order in which they
/// first appear in the batch.
pub fn select_top(records: &[RawFlightRecord]) -> Vec<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let name = record.airline.as_str();
        match position.get(name) {
            Some(&i) => counts[i].1 += 1,
            None => {
                position.insert(name, counts.len());
                counts.push((name, 1));
            }
        }
    }

    // sort_by is stable, so first-seen order survives among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    counts
        .into_iter()
        .take(TOP_AIRLINES)
        .map(|(name, _)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(airline: &str) -> RawFlightRecord {
        RawFlightRecord {
            airline: airline.to_string(),
            flight_number: "1".to_string(),
            scheduled_time: 0,
            actual_time: None,
            status: None,
            counterpart_country: None,
        }
    }

    fn batch(airlines: &[&str]) -> Vec<RawFlightRecord> {
        airlines.iter().map(|a| record(a)).collect()
    }

    #[test]
    fn test_empty_batch() {
        assert!(select_top(&[]).is_empty());
    }

    #[test]
    fn test_orders_by_count() {
        let records = batch(&["B", "A", "A", "C", "A", "C"]);
        assert_eq!(select_top(&records), vec!["A", "C", "B"]);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let records = batch(&["Z", "Y", "X", "Y", "Z", "X"]);
        assert_eq!(select_top(&records), vec!["Z", "Y", "X"]);
    }

    #[test]
    fn test_caps_at_five() {
        let records = batch(&["A", "B", "C", "D", "E", "F", "G", "G"]);
        let top = select_top(&records);

        assert_eq!(top.len(), TOP_AIRLINES);
        assert_eq!(top, vec!["G", "A", "B", "C", "D"]);
    }

    #[test]
    fn test_every_name_is_in_the_batch() {
        let records = batch(&["Qatar Airways", "Emirates", "Qatar Airways", "flydubai"]);
        for name in select_top(&records) {
            assert!(records.iter().any(|r| r.airline == name));
        }
    }
}
