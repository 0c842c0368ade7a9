use std::collections::HashSet;
use std::num::NonZeroUsize;

use futures::stream::{self, StreamExt};

use crate::categories::CategorySpec;
use crate::models::{Coordinate, NearbyQuery, PlaceEntry};
use crate::providers::PlaceSearch;

/// Places for one category in first-discovered order, deduplicated by id.
#[derive(Debug, Default)]
struct DiscoveredPlaces {
    seen: HashSet<String>,
    places: Vec<PlaceEntry>,
}

impl DiscoveredPlaces {
    /// Keep the first observation of each id; later ones are dropped unmerged.
    fn absorb(&mut self, observed: Vec<PlaceEntry>) -> usize {
        let before = self.places.len();
        for place in observed {
            if self.seen.insert(place.place_id.clone()) {
                self.places.push(place);
            }
        }
        self.places.len() - before
    }
}

/// Runs nearby searches around route sample points.
///
/// All searches of one call share a single pool bounded by `concurrency`.
/// Results are consumed in submission order (category, then sample point),
/// so output order never depends on which request finishes first.
pub struct PlaceAggregator<'a> {
    search: &'a dyn PlaceSearch,
    concurrency: NonZeroUsize,
}

impl<'a> PlaceAggregator<'a> {
    pub fn new(search: &'a dyn PlaceSearch, concurrency: NonZeroUsize) -> Self {
        Self {
            search,
            concurrency,
        }
    }

    pub async fn find_along_route(
        &self,
        points: &[Coordinate],
        spec: &CategorySpec,
        radius_meters: u32,
    ) -> Vec<PlaceEntry> {
        self.find_for_categories(points, &[spec], radius_meters)
            .await
            .pop()
            .unwrap_or_default()
    }

    /// One place list per entry of `specs`, in the same order.
    ///
    /// A failed or empty search for a point is skipped; it never aborts the
    /// other searches.
    pub async fn find_for_categories(
        &self,
        points: &[Coordinate],
        specs: &[&CategorySpec],
        radius_meters: u32,
    ) -> Vec<Vec<PlaceEntry>> {
        let mut discovered: Vec<DiscoveredPlaces> =
            specs.iter().map(|_| DiscoveredPlaces::default()).collect();

        // Owned queries keep the planning future `Send` when it is spawned.
        let queries: Vec<(usize, usize, NearbyQuery)> = specs
            .iter()
            .enumerate()
            .flat_map(|(category_idx, spec)| {
                let keyword = spec.keyword_filter();
                points.iter().enumerate().map(move |(point_idx, point)| {
                    let query = NearbyQuery {
                        location: *point,
                        radius_meters,
                        place_type: spec.place_type.clone(),
                        keyword: keyword.clone(),
                    };
                    (category_idx, point_idx, query)
                })
            })
            .collect();

        let search = self.search;
        let mut outcomes = stream::iter(queries)
            .map(move |(category_idx, point_idx, query)| async move {
                let outcome = search.nearby(&query).await;
                (category_idx, point_idx, query, outcome)
            })
            .buffered(self.concurrency.get());

        let mut failed_points = 0usize;
        while let Some((category_idx, point_idx, query, outcome)) = outcomes.next().await {
            let Some(target) = discovered.get_mut(category_idx) else {
                continue;
            };
            match outcome {
                Ok(places) if places.is_empty() => {
                    tracing::debug!(
                        point = point_idx,
                        place_type = %query.place_type,
                        "no places near sample point"
                    );
                }
                Ok(places) => {
                    let observed = places.len();
                    let added = target.absorb(places);
                    tracing::debug!(
                        point = point_idx,
                        place_type = %query.place_type,
                        "{observed} places observed, {added} new"
                    );
                }
                Err(err) => {
                    failed_points += 1;
                    tracing::warn!(
                        point = point_idx,
                        place_type = %query.place_type,
                        "skipping sample point: {err}"
                    );
                }
            }
        }

        if failed_points > 0 {
            tracing::warn!(
                "{failed_points} of {} nearby searches failed",
                points.len() * specs.len()
            );
        }

        discovered.into_iter().map(|found| found.places).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::test_support::{StubPlaceSearch, place};

    fn concurrency(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn beach_spec() -> CategorySpec {
        CategorySpec::new("natural_feature", &["beach"])
    }

    fn ids(places: &[PlaceEntry]) -> Vec<&str> {
        places.iter().map(|p| p.place_id.as_str()).collect()
    }

    #[tokio::test]
    async fn duplicate_ids_keep_first_observation() {
        let a = Coordinate::new(15.0, 73.0);
        let b = Coordinate::new(15.1, 73.1);
        let mut first = place("dup", "First name", a);
        first.rating = Some(4.0);
        let mut second = place("dup", "Second name", b);
        second.rating = Some(2.0);
        let search = StubPlaceSearch::new()
            .with_places(a, "natural_feature", vec![first.clone()])
            .with_places(b, "natural_feature", vec![second, place("other", "Other", b)]);

        let aggregator = PlaceAggregator::new(&search, concurrency(4));
        let places = aggregator.find_along_route(&[a, b], &beach_spec(), 10_000).await;

        assert_eq!(ids(&places), vec!["dup", "other"]);
        assert_eq!(places[0], first);
    }

    #[tokio::test]
    async fn failed_point_is_skipped() {
        let a = Coordinate::new(15.0, 73.0);
        let b = Coordinate::new(15.1, 73.1);
        let c = Coordinate::new(15.2, 73.2);
        let search = StubPlaceSearch::new()
            .with_places(a, "natural_feature", vec![place("a1", "A", a)])
            .failing_at(b, ProviderError::Status { service: "places", status: 500 })
            .with_places(c, "natural_feature", vec![place("c1", "C", c)]);

        let aggregator = PlaceAggregator::new(&search, concurrency(2));
        let places = aggregator.find_along_route(&[a, b, c], &beach_spec(), 5_000).await;

        assert_eq!(ids(&places), vec!["a1", "c1"]);
        assert_eq!(search.call_count(), 3);
    }

    #[tokio::test]
    async fn one_search_per_point_with_category_filter() {
        let points = [Coordinate::new(1.0, 1.0), Coordinate::new(2.0, 2.0)];
        let search = StubPlaceSearch::new();

        let aggregator = PlaceAggregator::new(&search, concurrency(1));
        let places = aggregator.find_along_route(&points, &beach_spec(), 15_000).await;

        assert!(places.is_empty());
        let queries = search.queries();
        assert_eq!(queries.len(), 2);
        for (query, point) in queries.iter().zip(points) {
            assert_eq!(query.location, point);
            assert_eq!(query.radius_meters, 15_000);
            assert_eq!(query.place_type, "natural_feature");
            assert_eq!(query.keyword.as_deref(), Some("beach"));
        }
    }

    #[tokio::test]
    async fn order_follows_sample_points_regardless_of_concurrency() {
        let points: Vec<Coordinate> = (0..6i32)
            .map(|i| Coordinate::new(10.0 + f64::from(i), 70.0))
            .collect();
        let mut search = StubPlaceSearch::new();
        for (i, point) in points.iter().enumerate() {
            search = search.with_places(
                *point,
                "restaurant",
                vec![place(&format!("p{i}"), "Diner", *point), place("shared", "Chain", *point)],
            );
        }
        let spec = CategorySpec::new("restaurant", &[]);

        let sequential = PlaceAggregator::new(&search, concurrency(1))
            .find_along_route(&points, &spec, 10_000)
            .await;
        let parallel = PlaceAggregator::new(&search, concurrency(6))
            .find_along_route(&points, &spec, 10_000)
            .await;

        assert_eq!(sequential, parallel);
        assert_eq!(
            ids(&parallel),
            vec!["p0", "shared", "p1", "p2", "p3", "p4", "p5"]
        );
    }

    #[tokio::test]
    async fn categories_are_deduplicated_independently() {
        let a = Coordinate::new(15.0, 73.0);
        let search = StubPlaceSearch::new()
            .with_places(a, "restaurant", vec![place("both", "Shack", a)])
            .with_places(a, "natural_feature", vec![place("both", "Shack", a)]);
        let restaurant = CategorySpec::new("restaurant", &[]);
        let beach = beach_spec();

        let lists = PlaceAggregator::new(&search, concurrency(3))
            .find_for_categories(&[a], &[&restaurant, &beach], 10_000)
            .await;

        assert_eq!(lists.len(), 2);
        assert_eq!(ids(&lists[0]), vec!["both"]);
        assert_eq!(ids(&lists[1]), vec!["both"]);
    }

    #[tokio::test]
    async fn no_points_means_no_calls() {
        let search = StubPlaceSearch::new();

        let places = PlaceAggregator::new(&search, concurrency(4))
            .find_along_route(&[], &beach_spec(), 10_000)
            .await;

        assert!(places.is_empty());
        assert_eq!(search.call_count(), 0);
    }
}
