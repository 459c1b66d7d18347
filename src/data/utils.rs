/// Digits after the decimal point in the shortest rendering of `step`,
/// 4 when the rendering has no fractional part.
pub fn infer_decimals(step: f64) -> usize {
    let rendered = format!("{step}");
    match rendered.split_once('.') {
        Some((_, fraction)) if !fraction.is_empty() => fraction.len(),
        _ => 4,
    }
}

pub fn round_to(value: f64, decimals: usize) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Slider/label text for a threshold: rounded, shortest form, always with a
/// fractional part (`0.5`, `1.0`, `0.05`).
pub fn format_label(value: f64, decimals: usize) -> String {
    let rendered = format!("{}", round_to(value, decimals));
    if rendered.contains('.') {
        rendered
    } else {
        format!("{rendered}.0")
    }
}

/// Fixed-point rendering with `,` as thousands separator (`1,234.50`).
pub fn format_thousands(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (fixed.clone(), None),
    };
    let grouped = group_digits(&int_part);
    let sign = if value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

pub fn format_count(count: usize) -> String {
    group_digits(&count.to_string())
}

fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `numerator / base`, or 0 when the base is zero.
pub fn share(numerator: f64, base: f64) -> f64 {
    if base == 0.0 {
        0.0
    } else {
        numerator / base
    }
}

/// `n` evenly spaced values from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimals_follow_the_step_rendering() {
        assert_eq!(infer_decimals(0.01), 2);
        assert_eq!(infer_decimals(0.05), 2);
        assert_eq!(infer_decimals(0.125), 3);
        assert_eq!(infer_decimals(0.1), 1);
        assert_eq!(infer_decimals(1.0), 4);
    }

    #[test]
    fn labels_keep_a_fractional_part() {
        assert_eq!(format_label(0.0, 2), "0.0");
        assert_eq!(format_label(1.0, 2), "1.0");
        assert_eq!(format_label(0.30000000000000004, 2), "0.3");
        assert_eq!(format_label(0.07, 2), "0.07");
    }

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(format_thousands(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_thousands(999.0, 2), "999.00");
        assert_eq!(format_thousands(-1000.0, 2), "-1,000.00");
        assert_eq!(format_thousands(-0.001, 2), "0.00");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(12), "12");
    }

    #[test]
    fn share_of_zero_base_is_zero() {
        assert_eq!(share(5.0, 0.0), 0.0);
        assert_eq!(share(5.0, 10.0), 0.5);
    }

    #[test]
    fn linspace_includes_both_ends() {
        let xs = linspace(0.0, 1.0, 5);
        assert_eq!(xs, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }
}
