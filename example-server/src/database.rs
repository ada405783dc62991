use sqlx::sqlite::SqlitePool;

pub async fn setup(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artist (
            ArtistId INTEGER PRIMARY KEY AUTOINCREMENT,
            Name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS genre (
            GenreId INTEGER PRIMARY KEY AUTOINCREMENT,
            Name TEXT UNIQUE NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS album (
            AlbumId INTEGER PRIMARY KEY AUTOINCREMENT,
            Title TEXT NOT NULL,
            ArtistId INTEGER NOT NULL REFERENCES artist(ArtistId)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS track (
            TrackId INTEGER PRIMARY KEY AUTOINCREMENT,
            Name TEXT NOT NULL,
            AlbumId INTEGER REFERENCES album(AlbumId),
            GenreId INTEGER REFERENCES genre(GenreId),
            Milliseconds INTEGER NOT NULL,
            UnitPrice REAL NOT NULL DEFAULT 0.99
        )
        "#,
    )
    .execute(pool)
    .await?;

    seed_sample_data(pool).await
}

async fn seed_sample_data(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let artist_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM artist")
        .fetch_one(pool)
        .await?;

    if artist_count.0 > 0 {
        return Ok(());
    }

    let genres = ["Rock", "Jazz", "Metal", "Blues", "Latin", "Classical"];
    for genre in genres {
        sqlx::query("INSERT INTO genre (Name) VALUES (?)")
            .bind(genre)
            .execute(pool)
            .await?;
    }

    let artists = [
        "AC/DC", "Accept", "Aerosmith", "Alanis Morissette", "Alice In Chains",
        "Antônio Carlos Jobim", "Apocalyptica", "Audioslave", "BackBeat", "Billy Cobham",
    ];
    for artist in artists {
        sqlx::query("INSERT INTO artist (Name) VALUES (?)")
            .bind(artist)
            .execute(pool)
            .await?;
    }

    let album_words = ["Live", "Greatest Hits", "Sessions", "Unplugged", "Anthology"];
    for index in 0..40 {
        let artist_id = (index % artists.len()) + 1;
        let title = format!(
            "{} {}",
            album_words[index % album_words.len()],
            index / album_words.len() + 1
        );

        sqlx::query("INSERT INTO album (Title, ArtistId) VALUES (?, ?)")
            .bind(title)
            .bind(artist_id as i64)
            .execute(pool)
            .await?;
    }

    for index in 0..400 {
        let album_id = (index % 40) + 1;
        let genre_id = (index % genres.len()) + 1;
        let milliseconds = 120_000 + (index * 7_919) % 300_000;

        sqlx::query("INSERT INTO track (Name, AlbumId, GenreId, Milliseconds) VALUES (?, ?, ?, ?)")
            .bind(format!("Track {}", index + 1))
            .bind(album_id as i64)
            .bind(genre_id as i64)
            .bind(milliseconds as i64)
            .execute(pool)
            .await?;
    }

    tracing::info!("sample data seeded: 10 artists, 6 genres, 40 albums, 400 tracks");
    Ok(())
}
