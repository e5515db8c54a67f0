use crate::detector::DiffOutcome;
use crate::types::{ItemData, LinkEntry, NotifyTarget, WatchlistEntry};

/// Parse a display price such as `"1,299.00"`.
///
/// Thousands separators are stripped and the leading decimal number is read,
/// so `"12.50 USD"` is 12.5 and `"1e3"` is 1000. An exponent marker with no
/// digits after it ends the number. Anything without a leading number is 0,
/// which means a broken price string looks like a drop to zero.
pub fn parse_price(raw: &str) -> f64 {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    let s = cleaned.trim_start();
    let bytes = s.as_bytes();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let mantissa_start = end;
    let mut seen_dot = false;
    while let Some(&b) = bytes.get(end) {
        match b {
            b'0'..=b'9' => {}
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if !bytes[mantissa_start..end].iter().any(u8::is_ascii_digit) {
        return 0.0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_start = end + 1;
        if matches!(bytes.get(exp_start), Some(b'+' | b'-')) {
            exp_start += 1;
        }
        let exp_digits = bytes[exp_start..].iter().take_while(|b| b.is_ascii_digit()).count();
        if exp_digits > 0 {
            end = exp_start + exp_digits;
        }
    }

    let value = s[..end].parse::<f64>().unwrap_or(0.0);
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Compare a freshly fetched product page against the stored entry.
///
/// The replacement carries the new price whenever it moved, notification or
/// not. A notification fires only for a drop that also lands at or under the
/// price limit, judged against the price stored before this check.
pub fn diff_link(entry: &LinkEntry, data: &ItemData) -> DiffOutcome {
    let new_price = parse_price(&data.price);

    let replacement = (new_price != entry.last_price).then(|| {
        WatchlistEntry::Link(LinkEntry {
            last_price: new_price,
            ..entry.clone()
        })
    });

    let under_limit = new_price <= entry.price_limit;
    let mut notifications = Vec::new();
    if under_limit && new_price < entry.last_price {
        let target = NotifyTarget::new(
            &entry.guild_id,
            &entry.channel_id,
            entry.price_limit,
            entry.price_percentage,
            entry.difference,
        );
        notifications.push(target.notification(
            &data.full_title,
            entry.last_price,
            new_price,
            &entry.link,
            &data.symbol,
        ));
    }

    DiffOutcome {
        notifications,
        replacement,
        changed: usize::from(new_price != entry.last_price),
    }
}
