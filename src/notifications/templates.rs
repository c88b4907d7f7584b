//! HTML bodies for the transactional emails.

use rust_decimal::Decimal;

pub fn order_confirmation(name: &str, order_number: &str, total: Decimal) -> String {
    format!(
        "<h2>Hi {name},</h2>\
         <p>Thank you for your order!</p>\
         <p><strong>Order Number:</strong> {order_number}</p>\
         <p><strong>Total Amount:</strong> ₹{total}</p>\
         <p>We will notify you once your order is shipped.</p>"
    )
}

pub fn registration_otp(code: &str) -> String {
    format!("<p>Your SmartBook OTP is <b>{code}</b>. It is valid for 5 minutes.</p>")
}

pub fn password_reset(name: &str, reset_url: &str) -> String {
    format!(
        "<h2>Password Reset Request</h2>\
         <p>Hello {name},</p>\
         <p>You requested to reset your password. Click below to reset:</p>\
         <a href=\"{reset_url}\" target=\"_blank\">Reset Password</a>\
         <p>This link will expire in 15 minutes.</p>\
         <p>If you did not request this, you can ignore this email.</p>"
    )
}

pub fn seller_request_received(name: &str) -> String {
    format!(
        "<h3>Hi {name},</h3>\
         <p>Thank you for applying to become a seller.</p>\
         <p>Your request is <b>pending review</b>.</p>"
    )
}

pub fn seller_request_admin_alert(name: &str, email: &str, business_name: &str) -> String {
    format!(
        "<h3>New Seller Request</h3>\
         <p><b>User:</b> {name} ({email})</p>\
         <p><b>Business:</b> {business_name}</p>\
         <p>Status: <b>Pending</b></p>\
         <p>Review the request from the admin dashboard.</p>"
    )
}

pub fn seller_request_approved(name: &str, dashboard_url: &str) -> String {
    format!(
        "<h3>Hello {name},</h3>\
         <p>Your seller request has been <b>approved</b>.</p>\
         <p>You can now access your <a href=\"{dashboard_url}\">Seller Dashboard</a>.</p>"
    )
}

pub fn seller_request_rejected(name: &str, reason: &str) -> String {
    format!(
        "<h3>Hello {name},</h3>\
         <p>Unfortunately, your seller request was <b>rejected</b>.</p>\
         <p>Reason: {reason}</p>"
    )
}

pub fn contact_acknowledgement(name: &str, message: &str) -> String {
    format!(
        "<p>Hi {name},</p>\
         <p>Thanks for contacting us. We have received your message:</p>\
         <blockquote>{message}</blockquote>\
         <p>Our support team will get back to you soon.</p>"
    )
}

pub fn contact_admin_alert(name: &str, email: &str, subject: &str, message: &str) -> String {
    format!(
        "<h3>New Contact Us Message</h3>\
         <p><b>Name:</b> {name}</p>\
         <p><b>Email:</b> {email}</p>\
         <p><b>Subject:</b> {subject}</p>\
         <p><b>Message:</b> {message}</p>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_confirmation_includes_number_and_total() {
        let html = order_confirmation("Asha", "ORD123456042", dec!(708));
        assert!(html.contains("ORD123456042"));
        assert!(html.contains("₹708"));
        assert!(html.contains("Asha"));
    }

    #[test]
    fn test_otp_template_carries_code() {
        assert!(registration_otp("482913").contains("482913"));
    }
}
