//! AT response parsing for the command subset the worker uses.
//!
//! Information responses have the shape `+NAME: f1,f2,"f3",...`. Quoted
//! fields may contain commas (the `+CCLK`/`+CMGL` time stamps do), so the
//! field splitter tracks quotes.

/// Final result code or information line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// `OK`
    Ok,
    /// `ERROR` or `+CME ERROR: ...`
    Error,
    /// `+CMS ERROR: <code>`
    CmsError(u16),
    /// `> ` prompt after `AT+CMGS`.
    Prompt,
    /// `+CMTI: ...` new-message notification.
    NewMessage,
    /// Anything else.
    Info(&'a str),
}

/// Classify one response line.
pub fn classify(line: &str) -> Line<'_> {
    let trimmed = line.trim_end();
    match trimmed {
        "OK" => Line::Ok,
        "ERROR" => Line::Error,
        ">" => Line::Prompt,
        _ if trimmed.starts_with("+CME ERROR") => Line::Error,
        _ if trimmed.starts_with("+CMTI:") => Line::NewMessage,
        _ => match trimmed.strip_prefix("+CMS ERROR:") {
            Some(code) => Line::CmsError(code.trim().parse().unwrap_or(0)),
            None => Line::Info(trimmed),
        },
    }
}

/// Comma-separated fields of an information response, quotes stripped.
#[derive(Debug, Clone)]
pub struct Fields<'a> {
    rest: Option<&'a str>,
}

/// Fields after the `+NAME:` prefix of `line`, if it carries that prefix.
pub fn fields<'a>(line: &'a str, prefix: &str) -> Option<Fields<'a>> {
    let body = line.trim().strip_prefix(prefix)?.strip_prefix(':')?;
    Some(Fields {
        rest: Some(body.trim_start()),
    })
}

impl<'a> Iterator for Fields<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let rest = self.rest?;
        let mut quoted = false;
        for (i, c) in rest.char_indices() {
            match c {
                '"' => quoted = !quoted,
                ',' if !quoted => {
                    self.rest = rest.get(i.saturating_add(1)..);
                    return Some(unquote(rest.get(..i).unwrap_or("")));
                }
                _ => {}
            }
        }
        self.rest = None;
        Some(unquote(rest))
    }
}

fn unquote(field: &str) -> &str {
    let f = field.trim();
    f.strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .unwrap_or(f)
}

/// Registration status from `+CREG: <n>,<stat>` (or the URC form `+CREG: <stat>`).
pub fn parse_creg(line: &str) -> Option<u8> {
    let mut f = fields(line, "+CREG")?;
    let first = f.next()?;
    match f.next() {
        Some(stat) => stat.parse().ok(),
        None => first.parse().ok(),
    }
}

/// `true` for registered-home (1) and registered-roaming (5).
pub fn is_registered(stat: u8) -> bool {
    matches!(stat, 1 | 5)
}

/// Operator name from `+COPS: <mode>,<format>,"<name>",<act>`.
pub fn parse_cops(line: &str) -> Option<&str> {
    fields(line, "+COPS")?.nth(2).filter(|n| !n.is_empty())
}

/// RSSI index from `+CSQ: <rssi>,<ber>`; 99 means unknown.
pub fn parse_csq(line: &str) -> Option<u8> {
    fields(line, "+CSQ")?.next()?.parse().ok()
}

/// Epoch seconds from `+CCLK: "yy/MM/dd,hh:mm:ss±zz"`.
pub fn parse_cclk(line: &str) -> Option<u32> {
    parse_stamp(fields(line, "+CCLK")?.next()?)
}

/// Header of one `+CMGL` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListedSms<'a> {
    /// SIM storage index.
    pub index: u16,
    /// Sender as printed by the modem.
    pub phone: &'a str,
    /// Service-centre time stamp, if it parsed.
    pub timestamp: Option<u32>,
}

/// Parse `+CMGL: <idx>,"<stat>","<oa>","<alpha>","<scts>"`.
pub fn parse_cmgl(line: &str) -> Option<ListedSms<'_>> {
    let mut f = fields(line, "+CMGL")?;
    let index = f.next()?.parse().ok()?;
    let _stat = f.next()?;
    let phone = f.next()?;
    let _alpha = f.next();
    let timestamp = f.next().and_then(parse_stamp);
    Some(ListedSms {
        index,
        phone,
        timestamp,
    })
}

/// Parse a modem time stamp `yy/MM/dd,hh:mm:ss±zz` (zone in quarter hours)
/// into UTC epoch seconds.
pub fn parse_stamp(stamp: &str) -> Option<u32> {
    let (date, time) = stamp.trim().split_once(',')?;
    let mut d = date.split('/');
    let yy: u32 = d.next()?.parse().ok()?;
    let month: u32 = d.next()?.parse().ok()?;
    let day: u32 = d.next()?.parse().ok()?;

    let zone_at = time.find(['+', '-']);
    let (clock, zone) = match zone_at {
        Some(i) => (time.get(..i)?, time.get(i..)),
        None => (time, None),
    };
    let mut t = clock.split(':');
    let hh: u32 = t.next()?.parse().ok()?;
    let mm: u32 = t.next()?.parse().ok()?;
    let ss: u32 = t.next()?.parse().ok()?;
    if yy > 99 || !(1..=12).contains(&month) || !(1..=31).contains(&day) || hh > 23 || mm > 59 || ss > 60 {
        return None;
    }

    let days = days_since_epoch(yy.checked_add(2000)?, month, day)?;
    let local = days
        .checked_mul(86_400)?
        .checked_add(hh.checked_mul(3600)?)?
        .checked_add(mm.checked_mul(60)?)?
        .checked_add(ss)?;
    let quarters: i64 = match zone {
        Some(z) => z.parse().ok()?,
        None => 0,
    };
    let utc = i64::from(local).checked_sub(quarters.checked_mul(900)?)?;
    u32::try_from(utc).ok()
}

/// Days from 1970-01-01 to the given civil date (years 1970..=2105).
fn days_since_epoch(year: u32, month: u32, day: u32) -> Option<u32> {
    let y = if month <= 2 { year.checked_sub(1)? } else { year };
    let era = y / 400;
    let yoe = y.checked_sub(era.checked_mul(400)?)?;
    let mp = (month.checked_add(9)?) % 12;
    let doy = (153u32.checked_mul(mp)?.checked_add(2)? / 5)
        .checked_add(day)?
        .checked_sub(1)?;
    let doe = yoe
        .checked_mul(365)?
        .checked_add(yoe / 4)?
        .checked_sub(yoe / 100)?
        .checked_add(doy)?;
    era.checked_mul(146_097)?.checked_add(doe)?.checked_sub(719_468)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_final_codes() {
        assert_eq!(classify("OK"), Line::Ok);
        assert_eq!(classify("ERROR"), Line::Error);
        assert_eq!(classify("+CME ERROR: 10"), Line::Error);
        assert_eq!(classify("+CMS ERROR: 500"), Line::CmsError(500));
        assert_eq!(classify("> "), Line::Prompt);
        assert_eq!(classify("+CMTI: \"SM\",3"), Line::NewMessage);
        assert_eq!(classify("+CSQ: 21,99"), Line::Info("+CSQ: 21,99"));
    }

    #[test]
    fn test_creg_both_forms() {
        assert_eq!(parse_creg("+CREG: 0,1"), Some(1));
        assert_eq!(parse_creg("+CREG: 0,5"), Some(5));
        assert_eq!(parse_creg("+CREG: 2"), Some(2));
        assert_eq!(parse_creg("+CSQ: 2,3"), None);
        assert!(is_registered(5));
        assert!(!is_registered(2));
    }

    #[test]
    fn test_cops_and_csq() {
        assert_eq!(parse_cops("+COPS: 0,0,\"MeshTel\",7"), Some("MeshTel"));
        assert_eq!(parse_cops("+COPS: 0"), None);
        assert_eq!(parse_csq("+CSQ: 21,99"), Some(21));
    }

    #[test]
    fn test_cclk_to_epoch() {
        assert_eq!(parse_cclk("+CCLK: \"24/05/01,12:30:00+00\""), Some(1_714_566_600));
        // +08 quarter hours is UTC+2.
        assert_eq!(parse_cclk("+CCLK: \"24/05/01,14:30:00+08\""), Some(1_714_566_600));
        assert_eq!(parse_stamp("24/05/01,10:30:00-08"), Some(1_714_566_600));
        assert_eq!(parse_cclk("+CCLK: \"garbage\""), None);
    }

    #[test]
    fn test_leap_day() {
        assert_eq!(parse_stamp("24/02/29,00:00:00+00"), Some(1_709_164_800));
    }

    #[test]
    fn test_cmgl_header_keeps_quoted_comma() {
        let h = parse_cmgl("+CMGL: 3,\"REC UNREAD\",\"+1234\",\"\",\"24/05/01,12:31:00+00\"").unwrap();
        assert_eq!(h.index, 3);
        assert_eq!(h.phone, "+1234");
        assert_eq!(h.timestamp, Some(1_714_566_660));
    }
}
