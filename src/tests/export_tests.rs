//! tests/export_tests.rs - CSV export of address operations

#[cfg(test)]
mod tests {
    use crate::{
        service::export::{format_token_value, render_csv},
        tests::fixtures::{explorer, HASH_A, HASH_F, OTHER, TOKEN, UNKNOWN, WALLET},
    };

    const HEADER: &str = "date;txhash;from;to;token-name;token-address;value;symbol";

    #[test]
    fn test_format_token_value() {
        assert_eq!(format_token_value("1000000000000000000", 18), "1.0000");
        assert_eq!(format_token_value("1e18", 18), "1.0000", "Exponent notation is accepted");
        assert_eq!(format_token_value("123456", 5), "1.2346", "Rounded half up");
        assert_eq!(format_token_value("125", 4), "0.0125");
        assert_eq!(format_token_value("42", 0), "42.0000");
        assert_eq!(format_token_value("n/a", 18), "n/a", "Unparsable input passes through");
    }

    #[test]
    fn test_format_token_value_keeps_four_places() {
        assert_eq!(format_token_value("0", 18), "0.0000");
        assert_eq!(format_token_value("1", 18), "0.0000", "Dust rounds to zero");
        assert_eq!(format_token_value("50000", 18), "0.0000");
        assert_eq!(format_token_value("50000000000000", 18), "0.0001", "Half a unit rounds up");
        assert_eq!(format_token_value("49999999999999", 18), "0.0000");
        assert_eq!(format_token_value("120000", 4), "12.0000");
        assert_eq!(format_token_value("-15", 1), "-1.5000");
    }

    #[test]
    fn test_empty_export_has_header() {
        let csv = render_csv(&[]).unwrap();
        assert_eq!(csv, format!("{}\r\n", HEADER));
    }

    #[tokio::test]
    async fn test_wallet_export() {
        let explorer = explorer().await;
        let csv = explorer.get_address_operations_csv(WALLET).await.unwrap();

        let lines: Vec<&str> = csv.split("\r\n").filter(|l| !l.is_empty()).collect();
        assert!(csv.ends_with("\r\n"), "Rows are CRLF terminated");
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines.len(), 5, "Header plus the four transfers of the wallet");

        assert!(lines[1].contains(HASH_F), "Newest transfer first");
        let expected = format!(
            "2020-09-13 12:26:40;{};{};{};Alpha Token;{};1.0000;ALP",
            HASH_A, WALLET, OTHER, TOKEN
        );
        assert_eq!(lines[4], expected);
    }

    #[tokio::test]
    async fn test_token_export_omits_token_address() {
        let explorer = explorer().await;
        let csv = explorer.get_address_operations_csv(TOKEN).await.unwrap();

        let rows: Vec<Vec<&str>> = csv
            .split("\r\n")
            .skip(1)
            .filter(|l| !l.is_empty())
            .map(|l| l.split(';').collect())
            .collect();
        assert_eq!(rows.len(), 3, "Transfers of the token only");
        for row in &rows {
            assert_eq!(row[4], "Alpha Token");
            assert_eq!(row[5], "", "Token address column is empty for a token export");
            assert_eq!(row[7], "ALP");
        }
        assert_eq!(rows[0][6], "0.5000");
    }

    #[tokio::test]
    async fn test_unknown_address_exports_header_only() {
        let explorer = explorer().await;
        let csv = explorer.get_address_operations_csv(UNKNOWN).await.unwrap();
        assert_eq!(csv, format!("{}\r\n", HEADER));

        let again = explorer.get_address_operations_csv(UNKNOWN).await.unwrap();
        assert_eq!(csv, again);
    }
}
