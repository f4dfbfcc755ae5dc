use indoc::indoc;

// Help text template with placeholder
pub const HELP_TEMPLATE: &str = indoc! {r#"
    Examples:
      # Writing a value explicitly
      %BINARY_NAME% ./data put mykey "Hello, world!"

      # Writing a value from stdin
      echo "Hello, world!" | %BINARY_NAME% ./data put mykey
      cat file.txt | %BINARY_NAME% ./data put mykey

      # Reading a value
      %BINARY_NAME% ./data get mykey

      # Deleting a key
      %BINARY_NAME% ./data del mykey

      # Requesting compaction (runs on the background maintenance thread)
      %BINARY_NAME% ./data compact

      # Displaying storage directory info
      %BINARY_NAME% ./data info
"#};
