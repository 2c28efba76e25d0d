use crate::core::product_id::parse_timestamp;
use crate::domain::model::GeoPolygon;
use crate::utils::error::{IngestError, Result};
use serde_json::Value;

const SIGNIFICANT_DIGITS: i32 = 8;

/// Shoelace area over `[lon, lat]` pairs. Positive for counter-clockwise rings.
pub fn signed_area(ring: &[[f64; 2]]) -> f64 {
    let n = ring.len();
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += ring[i][0] * ring[j][1];
        area -= ring[j][0] * ring[i][1];
    }
    area / 2.0
}

/// CMR rejects clockwise polygons.
pub fn ensure_counter_clockwise(ring: &[[f64; 2]]) -> Vec<[f64; 2]> {
    let mut out = ring.to_vec();
    if signed_area(ring) < 0.0 {
        out.reverse();
    }
    out
}

fn trim_fraction(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

/// General-format rendering with eight significant digits (`%.8g`).
pub fn format_significant(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }

    let scientific = format!("{:.*e}", (SIGNIFICANT_DIGITS - 1) as usize, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => return scientific,
    };

    if exponent < -4 || exponent >= SIGNIFICANT_DIGITS {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    } else {
        let decimals = (SIGNIFICANT_DIGITS - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, value))
    }
}

/// `&temporal=<start>,<end>` for a CMR granule search; either bound may be open.
pub fn temporal_param(starttime: Option<&str>, endtime: Option<&str>) -> Result<String> {
    let render = |value: Option<&str>| -> Result<String> {
        match value.filter(|v| !v.is_empty()) {
            Some(v) => Ok(parse_timestamp(v)?
                .format("%Y-%m-%dT%H:%M:%SZ")
                .to_string()),
            None => Ok(String::new()),
        }
    };

    let start = render(starttime)?;
    let end = render(endtime)?;
    if start.is_empty() && end.is_empty() {
        return Ok(String::new());
    }
    Ok(format!("&temporal={},{}", start, end))
}

pub fn spatial_param(polygon: Option<&GeoPolygon>) -> String {
    let ring = match polygon.and_then(GeoPolygon::outer_ring) {
        Some(ring) if !ring.is_empty() => ensure_counter_clockwise(ring),
        _ => return String::new(),
    };

    let coords = ring
        .iter()
        .map(|[lon, lat]| format!("{},{}", format_significant(*lon), format_significant(*lat)))
        .collect::<Vec<_>>()
        .join(",");
    format!("&polygon={}", coords)
}

/// Converts CMR `polygons[0][0]` ("lat lon lat lon ...") into a GeoJSON polygon.
pub fn parse_cmr_polygon(granule: &Value) -> Result<GeoPolygon> {
    let raw = granule
        .pointer("/polygons/0/0")
        .and_then(Value::as_str)
        .ok_or_else(|| IngestError::processing("CMR granule has no polygons"))?;

    let values = raw
        .split_whitespace()
        .map(|token| {
            token.parse::<f64>().map_err(|_| {
                IngestError::processing(format!("invalid coordinate {:?} in CMR polygon", token))
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    if values.len() % 2 != 0 {
        return Err(IngestError::processing(format!(
            "CMR polygon has an odd number of coordinates ({})",
            values.len()
        )));
    }

    let ring = values
        .chunks_exact(2)
        .map(|pair| [pair[1], pair[0]])
        .collect();
    Ok(GeoPolygon::new(ring))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn clockwise_square() -> Vec<[f64; 2]> {
        vec![[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]
    }

    #[test]
    fn test_signed_area_orientation() {
        let cw = clockwise_square();
        assert!(signed_area(&cw) < 0.0);
        let ccw: Vec<_> = cw.iter().rev().copied().collect();
        assert_eq!(signed_area(&ccw), 1.0);
    }

    #[test]
    fn test_clockwise_rings_are_reversed() {
        let ring = ensure_counter_clockwise(&clockwise_square());
        assert_eq!(ring[1], [1.0, 0.0]);
        assert!(signed_area(&ring) > 0.0);
    }

    #[test]
    fn test_format_significant() {
        assert_eq!(format_significant(-118.25), "-118.25");
        assert_eq!(format_significant(34.123456789), "34.123457");
        assert_eq!(format_significant(10.0), "10");
        assert_eq!(format_significant(0.0), "0");
        assert_eq!(format_significant(0.00001234), "1.234e-05");
        assert_eq!(format_significant(123456789.0), "1.2345679e+08");
    }

    #[test]
    fn test_temporal_param() {
        assert_eq!(temporal_param(None, None).unwrap(), "");
        assert_eq!(
            temporal_param(Some("2019-05-14T03:41:05.123Z"), None).unwrap(),
            "&temporal=2019-05-14T03:41:05Z,"
        );
        assert_eq!(
            temporal_param(Some("2019-05-14"), Some("2019-05-15")).unwrap(),
            "&temporal=2019-05-14T00:00:00Z,2019-05-15T00:00:00Z"
        );
    }

    #[test]
    fn test_spatial_param_is_counter_clockwise() {
        let poly = GeoPolygon::new(clockwise_square());
        assert_eq!(spatial_param(Some(&poly)), "&polygon=0,0,1,0,1,1,0,1,0,0");
        assert_eq!(spatial_param(None), "");
    }

    #[test]
    fn test_parse_cmr_polygon_swaps_lat_lon() {
        let granule = json!({"polygons": [["34.5 -118.2 34.6 -118.2 34.6 -118.1 34.5 -118.2"]]});
        let poly = parse_cmr_polygon(&granule).unwrap();
        let ring = poly.outer_ring().unwrap();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring[0], [-118.2, 34.5]);

        assert!(parse_cmr_polygon(&json!({"polygons": [["34.5 -118.2 34.6"]]})).is_err());
        assert!(parse_cmr_polygon(&json!({})).is_err());
    }
}
