use geo::{Coord, LineString, Point};
use geojson::{Feature, FeatureCollection, Geometry, Value as GeoJsonValue};
use serde_json::json;

use crate::{
    Error,
    model::{Leg, Route, SnappedWaypoint, WaypointKind},
};

impl Route {
    /// Converts the route to a `GeoJSON` `FeatureCollection`: one `LineString`
    /// per non-degenerate leg followed by one `Point` per snapped waypoint.
    pub fn to_geojson(&self) -> Result<FeatureCollection, Error> {
        let mut features = Vec::with_capacity(self.legs.len() + self.waypoints.len());

        for (idx, leg) in self.legs.iter().enumerate() {
            if leg.is_degenerate() {
                continue;
            }
            features.push(leg_feature(idx, leg)?);
        }
        for waypoint in &self.waypoints {
            features.push(waypoint_feature(waypoint)?);
        }

        Ok(FeatureCollection {
            features,
            bbox: None,
            foreign_members: None,
        })
    }

    pub fn to_geojson_string(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(&self.to_geojson()?)?)
    }
}

fn leg_feature(idx: usize, leg: &Leg) -> Result<Feature, Error> {
    let coords: Vec<Coord<f64>> = leg
        .coordinates
        .iter()
        .map(|c| Coord { x: c.lon, y: c.lat })
        .collect();
    let elevations: Vec<Option<f64>> = leg.coordinates.iter().map(|c| c.elevation).collect();
    let geometry = Geometry::new(GeoJsonValue::from(&LineString::new(coords)));

    let value = json!({
        "type": "Feature",
        "geometry": geometry,
        "properties": {
            "feature_type": "leg",
            "leg_index": idx,
            "from": leg.from,
            "to": leg.to,
            "distance_m": leg.distance_m,
            "ascent_m": leg.ascent_m,
            "descent_m": leg.descent_m,
            "elevations": elevations,
        }
    });

    serde_json::from_value::<Feature>(value).map_err(|e| Error::InvalidData(e.to_string()))
}

fn waypoint_feature(waypoint: &SnappedWaypoint) -> Result<Feature, Error> {
    let point = Point::new(waypoint.snapped.lon, waypoint.snapped.lat);
    let geometry = Geometry::new(GeoJsonValue::from(&point));
    let kind = match waypoint.waypoint.kind {
        WaypointKind::Summit => "summit",
        WaypointKind::PointOfInterest => "point_of_interest",
    };

    let value = json!({
        "type": "Feature",
        "geometry": geometry,
        "properties": {
            "feature_type": "waypoint",
            "name": waypoint.name(),
            "kind": kind,
            "index": waypoint.index,
            "node_id": waypoint.node_id,
            "snap_distance_m": waypoint.snap_distance_m,
            "elevation": waypoint.snapped.elevation,
        }
    });

    serde_json::from_value::<Feature>(value).map_err(|e| Error::InvalidData(e.to_string()))
}

#[cfg(test)]
mod tests {
    use crate::{
        PlannerConfig, RoutePlanner,
        model::{PathEdge, PathGraph, PathNode, Waypoint},
    };

    #[test]
    fn route_exports_legs_and_waypoints() {
        let nodes = vec![
            PathNode::new(1, 55.000, -3.0).with_elevation(100.0),
            PathNode::new(2, 55.001, -3.0).with_elevation(110.0),
            PathNode::new(3, 55.002, -3.0).with_elevation(105.0),
        ];
        let edges = vec![
            PathEdge::between(&nodes[0], &nodes[1]),
            PathEdge::between(&nodes[1], &nodes[2]),
        ];
        let graph = PathGraph::new(nodes, edges).unwrap();
        let waypoints = [
            Waypoint::summit("Low", 55.000, -3.0),
            Waypoint::summit("High", 55.002, -3.0),
        ];
        let route =
            RoutePlanner::plan_on_graph(&graph, &waypoints, &PlannerConfig::default()).unwrap();

        let collection = route.to_geojson().unwrap();
        assert_eq!(collection.features.len(), 3);

        let json: serde_json::Value =
            serde_json::from_str(&route.to_geojson_string().unwrap()).unwrap();
        let leg = &json["features"][0];
        assert_eq!(leg["geometry"]["type"], "LineString");
        assert_eq!(leg["geometry"]["coordinates"].as_array().unwrap().len(), 3);
        assert_eq!(leg["properties"]["from"], "Low");
        assert_eq!(json["features"][2]["properties"]["name"], "High");
        assert_eq!(json["features"][2]["properties"]["kind"], "summit");
    }
}
