//! Parsing for `mirror sweep`'s `--cpus`/`--arrival-rate` range arguments and
//! the Cartesian product of sweep points they describe.

/// One point in a sweep: a `cpu_count`/`arrival_rate` pair to run a
/// simulation at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPoint {
    pub cpu_count: u32,
    pub arrival_rate: f64,
}

/// Parse a comma-separated integer list, e.g. `"8,16,32"`.
pub fn parse_u32_list(raw: &str) -> Result<Vec<u32>, String> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<u32>()
                .map_err(|e| format!("invalid integer '{part}' in '{raw}': {e}"))
        })
        .collect()
}

/// Parse either a comma-separated float list (`"5,10,15"`) or a
/// `start:stop:step` range (`"5:75:5"`, inclusive of `stop` when it falls
/// exactly on a step).
pub fn parse_f64_range(raw: &str) -> Result<Vec<f64>, String> {
    if let Some((start, rest)) = raw.split_once(':') {
        let (stop, step) = rest
            .split_once(':')
            .ok_or_else(|| format!("range '{raw}' must be 'start:stop:step'"))?;
        let start: f64 = start
            .trim()
            .parse()
            .map_err(|e| format!("invalid range start '{start}' in '{raw}': {e}"))?;
        let stop: f64 = stop
            .trim()
            .parse()
            .map_err(|e| format!("invalid range stop '{stop}' in '{raw}': {e}"))?;
        let step: f64 = step
            .trim()
            .parse()
            .map_err(|e| format!("invalid range step '{step}' in '{raw}': {e}"))?;
        if step <= 0.0 {
            return Err(format!("range step must be positive, got {step} in '{raw}'"));
        }
        let mut values = Vec::new();
        let mut v = start;
        // A small epsilon keeps an exact multiple of `step` (e.g. 75.0 from
        // 5:75:5) from being dropped to floating-point rounding.
        while v <= stop + step * 1e-9 {
            values.push(v);
            v += step;
        }
        Ok(values)
    } else {
        raw.split(',')
            .map(|part| {
                part.trim()
                    .parse::<f64>()
                    .map_err(|e| format!("invalid number '{part}' in '{raw}': {e}"))
            })
            .collect()
    }
}

/// The Cartesian product of `cpus x arrival_rates`, in `cpus`-major order.
pub fn sweep_points(cpus: &[u32], arrival_rates: &[f64]) -> Vec<SweepPoint> {
    cpus.iter()
        .flat_map(|&cpu_count| {
            arrival_rates.iter().map(move |&arrival_rate| SweepPoint {
                cpu_count,
                arrival_rate,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_integers() {
        assert_eq!(parse_u32_list("8,16,32").unwrap(), vec![8, 16, 32]);
    }

    #[test]
    fn rejects_non_integer_in_list() {
        assert!(parse_u32_list("8,sixteen").is_err());
    }

    #[test]
    fn parses_start_stop_step_range_inclusive() {
        assert_eq!(
            parse_f64_range("5:75:5").unwrap(),
            vec![5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0, 40.0, 45.0, 50.0, 55.0, 60.0, 65.0, 70.0, 75.0]
        );
    }

    #[test]
    fn parses_comma_separated_floats() {
        assert_eq!(parse_f64_range("5,10,15").unwrap(), vec![5.0, 10.0, 15.0]);
    }

    #[test]
    fn rejects_non_positive_step() {
        assert!(parse_f64_range("5:75:0").is_err());
    }

    #[test]
    fn sweep_points_are_in_cpus_major_order() {
        let points = sweep_points(&[8, 16], &[5.0, 10.0]);
        assert_eq!(
            points,
            vec![
                SweepPoint { cpu_count: 8, arrival_rate: 5.0 },
                SweepPoint { cpu_count: 8, arrival_rate: 10.0 },
                SweepPoint { cpu_count: 16, arrival_rate: 5.0 },
                SweepPoint { cpu_count: 16, arrival_rate: 10.0 },
            ]
        );
    }
}
