//! Conversions between cozy-chess types and the wire representations used by
//! the server (`"e4"` squares, `"q"` promotion letters).

use cozy_chess::{File, Piece, Rank, Square};

use crate::rules::IllegalMoveError;

/// Format a square as file letter + rank digit (`"e4"`).
pub fn format_square(sq: Square) -> String {
    format!("{}{}", file_to_char(sq.file()), rank_to_char(sq.rank()))
}

/// Parse a wire square (`"e4"`). Case-insensitive on the file letter.
pub fn parse_square(s: &str) -> Result<Square, IllegalMoveError> {
    let mut chars = s.trim().chars();
    let (Some(f), Some(r), None) = (chars.next(), chars.next(), chars.next()) else {
        return Err(IllegalMoveError::InvalidSquare(s.to_string()));
    };

    let file = match f.to_ascii_lowercase() {
        'a' => File::A,
        'b' => File::B,
        'c' => File::C,
        'd' => File::D,
        'e' => File::E,
        'f' => File::F,
        'g' => File::G,
        'h' => File::H,
        _ => return Err(IllegalMoveError::InvalidSquare(s.to_string())),
    };

    let rank = match r {
        '1' => Rank::First,
        '2' => Rank::Second,
        '3' => Rank::Third,
        '4' => Rank::Fourth,
        '5' => Rank::Fifth,
        '6' => Rank::Sixth,
        '7' => Rank::Seventh,
        '8' => Rank::Eighth,
        _ => return Err(IllegalMoveError::InvalidSquare(s.to_string())),
    };

    Ok(Square::new(file, rank))
}

/// Parse a promotion letter. Only the four promotable pieces are accepted.
pub fn parse_promotion(s: &str) -> Result<Piece, IllegalMoveError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "q" => Ok(Piece::Queen),
        "r" => Ok(Piece::Rook),
        "b" => Ok(Piece::Bishop),
        "n" => Ok(Piece::Knight),
        _ => Err(IllegalMoveError::InvalidPromotion(s.to_string())),
    }
}

/// Lowercase piece letter, as used in UCI promotion suffixes.
pub fn format_piece(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    }
}

/// Uppercase piece letter, as used in SAN.
pub fn format_piece_upper(piece: Piece) -> char {
    format_piece(piece).to_ascii_uppercase()
}

pub fn file_to_char(file: File) -> char {
    match file {
        File::A => 'a',
        File::B => 'b',
        File::C => 'c',
        File::D => 'd',
        File::E => 'e',
        File::F => 'f',
        File::G => 'g',
        File::H => 'h',
    }
}

pub fn rank_to_char(rank: Rank) -> char {
    match rank {
        Rank::First => '1',
        Rank::Second => '2',
        Rank::Third => '3',
        Rank::Fourth => '4',
        Rank::Fifth => '5',
        Rank::Sixth => '6',
        Rank::Seventh => '7',
        Rank::Eighth => '8',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_roundtrip_corners() {
        for s in ["a1", "h1", "a8", "h8", "e4"] {
            assert_eq!(format_square(parse_square(s).unwrap()), s);
        }
    }

    #[test]
    fn test_parse_square_rejects_garbage() {
        assert!(parse_square("").is_err());
        assert!(parse_square("e9").is_err());
        assert!(parse_square("i1").is_err());
        assert!(parse_square("e44").is_err());
    }

    #[test]
    fn test_parse_promotion() {
        assert_eq!(parse_promotion("q").unwrap(), Piece::Queen);
        assert_eq!(parse_promotion("N").unwrap(), Piece::Knight);
        assert!(matches!(
            parse_promotion("k"),
            Err(IllegalMoveError::InvalidPromotion(_))
        ));
    }
}
