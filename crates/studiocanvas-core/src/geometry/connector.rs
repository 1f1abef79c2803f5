//! Connector routing between two item boxes.

use crate::items::{ItemKind, ItemList, Routing, SceneItem};
use kurbo::{BezPath, Point, Rect};

/// Vertical lift of the curved route's control point above the higher endpoint.
pub const CURVE_LIFT: f64 = 50.0;

/// Fraction of the horizontal distance at which an elbow route bends.
pub const ELBOW_BEND_RATIO: f64 = 0.7;

/// A routed connector path in world coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub routing: Routing,
    /// Straight: `[start, end]`. Curved: `[start, control, end]`.
    /// Elbow: `[start, bend, bend, end]`.
    pub points: Vec<Point>,
}

impl Route {
    pub fn start(&self) -> Point {
        self.points[0]
    }

    pub fn end(&self) -> Point {
        self.points[self.points.len() - 1]
    }

    pub fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(self.start());
        match (self.routing, self.points.as_slice()) {
            (Routing::Curved, [_, control, end]) => path.quad_to(*control, *end),
            (_, [_, rest @ ..]) => {
                for p in rest {
                    path.line_to(*p);
                }
            }
            _ => {}
        }
        path
    }

    pub fn bounds(&self) -> Rect {
        self.points
            .iter()
            .skip(1)
            .fold(Rect::from_points(self.start(), self.start()), |acc, p| {
                acc.union_pt(*p)
            })
    }
}

/// Route from box `from` to box `to`, anchored at their centers.
pub fn route_connector(from: Rect, to: Rect, routing: Routing) -> Route {
    let start = from.center();
    let end = to.center();
    let points = match routing {
        Routing::Straight => vec![start, end],
        Routing::Curved => {
            let control = Point::new(
                (start.x + end.x) / 2.0,
                start.y.min(end.y) - CURVE_LIFT,
            );
            vec![start, control, end]
        }
        Routing::Elbow => {
            let bend_x = start.x + (end.x - start.x) * ELBOW_BEND_RATIO;
            vec![
                start,
                Point::new(bend_x, start.y),
                Point::new(bend_x, end.y),
                end,
            ]
        }
    };
    Route { routing, points }
}

/// Route of a connector item against the items it references.
///
/// `None` when the item is not a connector, an endpoint is unset, or an
/// endpoint no longer exists in `items`.
pub fn connector_route(item: &SceneItem, items: &ItemList) -> Option<Route> {
    let ItemKind::Connector { from, to, routing } = &item.kind else {
        return None;
    };
    let endpoint_box = |id| {
        items
            .get(id)
            .filter(|target| !target.kind.is_connector())
            .map(super::item_box)
    };
    let from = endpoint_box((*from)?)?;
    let to = endpoint_box((*to)?)?;
    Some(route_connector(from, to, *routing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{SceneItem, ShapeKind};

    fn boxes() -> (Rect, Rect) {
        (
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Rect::new(300.0, 200.0, 400.0, 300.0),
        )
    }

    #[test]
    fn test_straight_route() {
        let (a, b) = boxes();
        let route = route_connector(a, b, Routing::Straight);
        assert_eq!(route.points, vec![Point::new(50.0, 50.0), Point::new(350.0, 250.0)]);
    }

    #[test]
    fn test_curved_route_lifts_control() {
        let (a, b) = boxes();
        let route = route_connector(a, b, Routing::Curved);
        assert_eq!(route.points.len(), 3);
        assert_eq!(route.points[1], Point::new(200.0, 0.0));
    }

    #[test]
    fn test_elbow_route_bends_at_seventy_percent() {
        let (a, b) = boxes();
        let route = route_connector(a, b, Routing::Elbow);
        assert_eq!(
            route.points,
            vec![
                Point::new(50.0, 50.0),
                Point::new(260.0, 50.0),
                Point::new(260.0, 250.0),
                Point::new(350.0, 250.0),
            ]
        );
    }

    #[test]
    fn test_missing_endpoint_has_no_route() {
        let a = SceneItem::new(ItemKind::shape(ShapeKind::Rectangle), Point::ZERO);
        let b = SceneItem::new(ItemKind::shape(ShapeKind::Rectangle), Point::new(400.0, 0.0));
        let link = SceneItem::new(ItemKind::connector(a.id(), b.id(), Routing::Straight), Point::ZERO);

        let full = ItemList::new()
            .add_item(a.clone())
            .add_item(b.clone())
            .add_item(link.clone());
        let route = connector_route(&link, &full).unwrap();
        assert_eq!(route.start(), Point::new(75.0, 50.0));
        assert_eq!(route.end(), Point::new(475.0, 50.0));

        let partial = ItemList::new().add_item(a).add_item(link.clone());
        assert!(connector_route(&link, &partial).is_none());
    }

    #[test]
    fn test_route_bounds_cover_all_points() {
        let (a, b) = boxes();
        let route = route_connector(a, b, Routing::Curved);
        assert_eq!(route.bounds(), Rect::new(50.0, 0.0, 350.0, 250.0));
    }
}
