//! Masking for personal data that ends up in log lines

/// `kiran.shah@example.com` becomes `k***@e***`
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let local_head: String = local.chars().take(1).collect();
            let domain_head: String = domain.chars().take(1).collect();
            format!("{}***@{}***", local_head, domain_head)
        }
        None => "***".to_string(),
    }
}

/// Keeps the last four digits
pub fn mask_phone(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() <= 4 {
        return "*".repeat(digits.len());
    }
    let hidden = digits.len() - 4;
    let visible: String = digits.iter().skip(hidden).collect();
    format!("{}{}", "*".repeat(hidden), visible)
}
